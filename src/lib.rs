pub mod arity;
pub mod clausifier;
pub mod config;
pub mod diagnostics;
pub mod formula;
pub mod kb;
pub mod parser;
pub mod pred_vars;
pub mod preprocessor;
pub mod row_vars;
pub mod term;
pub mod type_restrictions;
pub mod variables;

pub use arity::{ArityError, check_arity};
pub use clausifier::{ClausalForm, Clause, clausify};
pub use config::{PreprocessConfig, load_config};
pub use diagnostics::{Diagnostic, Span};
pub use formula::Formula;
pub use kb::{KbOracle, KnowledgeBase, QueryLiteral, SortalTypeCache};
pub use parser::{is_balanced, parse_kif, parse_kif_with_source, parse_term};
pub use pred_vars::{PredVarOutcome, instantiate_pred_vars};
pub use preprocessor::Preprocessor;
pub use row_vars::{expand_row_vars, expand_row_vars_within};
pub use term::Term;
pub use type_restrictions::{add_type_restrictions, find_type, winnow_type_list};
pub use variables::{RenameMap, VarGen};

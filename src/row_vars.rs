use std::collections::BTreeSet;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::clausifier::{ClausalForm, clausify};
use crate::formula::Formula;
use crate::kb::KbOracle;
use crate::term::Term;
use crate::variables::VarGen;

/// Ceiling on the number of expansion steps for one row variable.
pub const MAX_ROW_EXPANSION: usize = 8;

const VARIABLE_ARITY_BUDGET: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionRange {
    pub min: usize,
    pub max: usize,
    pub variable_arity: bool,
}

impl Default for ExpansionRange {
    fn default() -> Self {
        Self {
            min: 1,
            max: MAX_ROW_EXPANSION,
            variable_arity: false,
        }
    }
}

/// Relations applied to `row_var` (or a clause-local renaming of it) anywhere in the clauses.
pub fn governing_relations(clausal: &ClausalForm, row_var: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for app in applications_with(clausal, row_var) {
        if let Some(head) = app.head() {
            out.insert(head.to_string());
        }
    }
    out
}

fn applications_with<'a>(clausal: &'a ClausalForm, row_var: &str) -> Vec<&'a Term> {
    let mut out = Vec::new();
    for clause in &clausal.clauses {
        for literal in clause.literals() {
            collect_applications(literal, row_var, clausal, &mut out);
        }
    }
    out
}

fn collect_applications<'a>(
    term: &'a Term,
    row_var: &str,
    clausal: &ClausalForm,
    out: &mut Vec<&'a Term>,
) {
    let Term::List(items) = term else {
        return;
    };
    let head_is_constant = items
        .first()
        .is_some_and(|h| h.as_atom().is_some() && !h.is_variable() && !h.is_skolem());
    let mentions = items.iter().skip(1).any(|arg| {
        arg.as_atom()
            .is_some_and(|name| arg.is_variable() && clausal.renames.maps_back_to(name, row_var))
    });
    if head_is_constant && mentions {
        out.push(term);
    }
    for item in items {
        collect_applications(item, row_var, clausal, out);
    }
}

pub fn expansion_range(kb: &dyn KbOracle, relations: &BTreeSet<String>) -> ExpansionRange {
    let mut range = ExpansionRange::default();
    for relation in relations {
        let arity = kb.valence(relation);
        if arity == 0 {
            range.variable_arity = true;
        } else if arity >= 1 {
            range.min = 1;
            range.max = range.max.min(arity as usize + 1);
        }
    }
    range
}

/// Tighten the expansion count using the shape of the literals holding the row variable.
pub fn adjust_expansion_count(
    variable_arity: bool,
    count: usize,
    row_var: &str,
    clausal: &ClausalForm,
) -> usize {
    applications_with(clausal, row_var)
        .into_iter()
        .map(|app| {
            if variable_arity {
                VARIABLE_ARITY_BUDGET.saturating_sub(app.list_length())
            } else {
                count.saturating_sub(app.list_length().saturating_sub(2))
            }
        })
        .min()
        .unwrap_or(count)
        .max(2)
}

/// Expand every row variable of `formula`. Formulas with quoted strings or no
/// row variables come back unchanged.
pub fn expand_row_vars(formula: &Formula, kb: &dyn KbOracle, vars: &mut VarGen) -> Vec<Formula> {
    expand_row_vars_within(formula, kb, vars, usize::MAX).0
}

/// Like [`expand_row_vars`], but never holds more than `budget` candidates.
/// The flag reports whether expansions were skipped to stay within it.
pub fn expand_row_vars_within(
    formula: &Formula,
    kb: &dyn KbOracle,
    vars: &mut VarGen,
    budget: usize,
) -> (Vec<Formula>, bool) {
    let Some(term) = formula.term() else {
        return (vec![formula.without_diagnostics()], false);
    };
    let row_vars = term.row_variables();
    if row_vars.is_empty() || term.contains_quoted_string() {
        return (vec![formula.derive(term.clone())], false);
    }

    let mut pending = vec![term.clone()];
    let mut finished: IndexSet<Term> = IndexSet::new();
    let mut truncated = false;
    for row_var in &row_vars {
        let mut requeued = Vec::new();
        'pending: for candidate in pending {
            let expansions = if candidate.contains_atom(row_var) {
                expand_one(&candidate, row_var, kb, vars)
            } else {
                vec![candidate]
            };
            for expanded in expansions {
                if finished.len() + requeued.len() >= budget {
                    truncated = true;
                    break 'pending;
                }
                route(expanded, &mut finished, &mut requeued);
            }
        }
        pending = requeued;
    }
    finished.extend(pending);
    debug!(input = %term, outputs = finished.len(), truncated, "expanded row variables");
    let out = finished.into_iter().map(|t| formula.derive(t)).collect();
    (out, truncated)
}

fn route(term: Term, finished: &mut IndexSet<Term>, requeued: &mut Vec<Term>) {
    if term.row_variables().is_empty() {
        finished.insert(term);
    } else {
        requeued.push(term);
    }
}

fn expand_one(term: &Term, row_var: &str, kb: &dyn KbOracle, vars: &mut VarGen) -> Vec<Term> {
    let clausal = clausify(term, vars);
    let relations = governing_relations(&clausal, row_var);
    let range = expansion_range(kb, &relations);
    let count = adjust_expansion_count(range.variable_arity, range.max, row_var, &clausal);
    trace!(
        row_var,
        ?relations,
        max = range.max,
        count,
        variable_arity = range.variable_arity,
        "row variable range"
    );

    let prefix = format!("?{}", &row_var[1..]);
    let fresh: Vec<Term> = (1..count)
        .map(|_| Term::atom(vars.new_variable(&prefix)))
        .collect();
    if range.variable_arity {
        (1..count)
            .map(|len| term.splice_row_variable(row_var, &fresh[..len]))
            .collect()
    } else {
        vec![term.splice_row_variable(row_var, &fresh)]
    }
}

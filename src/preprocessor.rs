use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use crate::arity::check_arity;
use crate::config::PreprocessConfig;
use crate::formula::Formula;
use crate::kb::{KbOracle, SET_OR_CLASS};
use crate::parser::is_balanced;
use crate::pred_vars::{PredVarOutcome, instantiate_pred_vars};
use crate::row_vars::expand_row_vars_within;
use crate::term::{Term, is_logical_operator};
use crate::type_restrictions::add_type_restrictions;
use crate::variables::VarGen;

/// Runs the rewriting stages over one formula at a time against a KB.
///
/// Every diagnostic produced while handling a formula is attached to that
/// input formula; derived formulas come back clean, carrying only provenance.
pub struct Preprocessor<'kb> {
    kb: &'kb dyn KbOracle,
    config: PreprocessConfig,
    vars: VarGen,
}

impl<'kb> Preprocessor<'kb> {
    pub fn new(kb: &'kb dyn KbOracle, config: PreprocessConfig) -> Self {
        Self {
            kb,
            config,
            vars: VarGen::new(),
        }
    }

    pub fn with_vars(mut self, vars: VarGen) -> Self {
        self.vars = vars;
        self
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn vars(&self) -> &VarGen {
        &self.vars
    }

    pub fn preprocess_all(&mut self, formulas: &mut [Formula], is_query: bool) -> Vec<Formula> {
        let mut out = Vec::new();
        for formula in formulas.iter_mut() {
            out.extend(self.preprocess(formula, is_query));
        }
        out
    }

    pub fn preprocess(&mut self, formula: &mut Formula, is_query: bool) -> Vec<Formula> {
        if !is_balanced(formula.text()) {
            formula.report("E-SYNTAX", "unbalanced parentheses or quotes");
            return Vec::new();
        }
        let Some(term) = formula.term().cloned() else {
            formula.report("E-SYNTAX", "formula text is not a single well-formed expression");
            return Vec::new();
        };

        let term = self.replace_non_ascii(&term);
        let mut live = self.expand_variables(term, formula);

        if !is_query {
            let facts = self.missing_sortal_facts(&live);
            live.extend(facts);
        }

        let mut accepted = Vec::new();
        for candidate in live {
            let candidate = if self.config.add_type_restrictions
                && !is_query
                && candidate.contains_variable()
            {
                add_type_restrictions(&candidate, self.kb)
            } else {
                candidate
            };
            let candidate = rewrite_surface(&candidate);
            if self.accept(&candidate, is_query, formula) {
                accepted.push(formula.derive(candidate));
            }
        }
        debug!(input = %formula.text(), accepted = accepted.len(), "preprocessed");
        accepted
    }

    fn replace_non_ascii(&self, term: &Term) -> Term {
        if !term.contains_non_ascii() {
            return term.clone();
        }
        let placeholder = self.config.non_ascii_placeholder.as_str();
        term.map_atoms(&|atom: &str| {
            atom.chars()
                .map(|c| {
                    if c.is_ascii() {
                        c.to_string()
                    } else {
                        placeholder.to_string()
                    }
                })
                .collect()
        })
    }

    /// Instantiate predicate variables, then expand row variables, until the
    /// candidate set stops changing or the expansion limit is hit.
    fn expand_variables(&mut self, term: Term, formula: &mut Formula) -> IndexSet<Term> {
        let limit = self.config.expansion_limit;
        let mut live: IndexSet<Term> = IndexSet::from([term]);
        loop {
            let mut truncated = false;
            let mut instantiated: IndexSet<Term> = IndexSet::new();
            for candidate in &live {
                if instantiated.len() >= limit {
                    truncated = true;
                    break;
                }
                if self.config.holds_prefix {
                    instantiated.insert(candidate.clone());
                    continue;
                }
                match instantiate_pred_vars(candidate, self.kb, &mut self.vars) {
                    PredVarOutcome::Instantiated(terms) => {
                        let room = limit - instantiated.len();
                        truncated |= terms.len() > room;
                        instantiated.extend(terms.into_iter().take(room));
                    }
                    PredVarOutcome::NotApplicable => {
                        instantiated.insert(candidate.clone());
                    }
                    PredVarOutcome::Rejected(reason) => {
                        trace!(candidate = %candidate, %reason, "instantiation rejected");
                        formula.report("E-PREDVAR", reason);
                    }
                }
            }

            let mut expanded: IndexSet<Term> = IndexSet::new();
            for candidate in instantiated {
                let room = limit - expanded.len();
                if room == 0 {
                    truncated = true;
                    break;
                }
                let derived = formula.derive(candidate);
                let (outs, cut) = expand_row_vars_within(&derived, self.kb, &mut self.vars, room);
                truncated |= cut;
                expanded.extend(outs.iter().filter_map(|out| out.term().cloned()));
            }

            if truncated {
                warn!(input = %formula.text(), limit, "expansion limit reached, truncating");
                formula.report(
                    "W-EXPANSION-LIMIT",
                    format!("variable expansion reached the limit of {limit} candidates"),
                );
                return expanded;
            }
            if expanded == live {
                return expanded;
            }
            live = expanded;
        }
    }

    /// `(instance C SetOrClass)` for every class-position constant not already
    /// known to the KB or synthesized earlier.
    fn missing_sortal_facts(&self, live: &IndexSet<Term>) -> Vec<Term> {
        let mut classes = IndexSet::new();
        for term in live {
            collect_class_constants(term, &mut classes);
        }
        let cache = self.kb.sortal_type_cache();
        let mut out = Vec::new();
        for class in classes {
            let fact = Term::app("instance", vec![Term::atom(class.clone()), Term::atom(SET_OR_CLASS)]);
            let key = format!("sortal:{class}:{SET_OR_CLASS}");
            if live.contains(&fact) || self.kb.contains_formula(&fact) || cache.contains_key(&key) {
                continue;
            }
            cache.insert(key, Some(SET_OR_CLASS.to_string()));
            trace!(%fact, "synthesized sortal fact");
            out.push(fact);
        }
        out
    }

    fn accept(&self, candidate: &Term, is_query: bool, formula: &mut Formula) -> bool {
        if candidate.contains_non_ascii() {
            formula.report(
                "W-UNSUITABLE",
                format!("dropped {candidate}: residual non-ASCII content"),
            );
            return false;
        }
        let logical_head = candidate.head().is_some_and(is_logical_operator);
        if !is_query
            && !logical_head
            && !candidate.contains_quoted_string()
            && !candidate.free_variables().is_empty()
        {
            formula.report(
                "W-UNSUITABLE",
                format!("dropped {candidate}: free variables in an assertion"),
            );
            return false;
        }
        if self.config.check_arity {
            if let Err(err) = check_arity(candidate, &|r: &str| self.kb.valence(r)) {
                formula.report("E-ARITY", format!("dropped {candidate}: {err}"));
                return false;
            }
        }
        true
    }
}

fn collect_class_constants(term: &Term, out: &mut IndexSet<String>) {
    let Term::List(items) = term else {
        return;
    };
    let positions: &[usize] = match term.head() {
        Some("instance") if items.len() == 3 => &[2],
        Some("subclass") if items.len() == 3 => &[1, 2],
        _ => &[],
    };
    for &pos in positions {
        let arg = &items[pos];
        if let Some(name) = arg.as_atom() {
            if !arg.is_variable() && !arg.is_quoted_string() && name != SET_OR_CLASS {
                out.insert(name.to_string());
            }
        }
    }
    for item in items {
        collect_class_constants(item, out);
    }
}

/// Surface rewrite hook. Quantifier bodies and application arguments are
/// rebuilt recursively; no surface form is currently translated.
pub fn rewrite_surface(term: &Term) -> Term {
    match term {
        Term::Atom(_) => term.clone(),
        Term::List(items) => {
            if let (Some(quantifier), Some(body)) = (term.head(), term.quantified_body()) {
                let vars = term.quantified_vars().into_iter().map(str::to_string).collect();
                return Term::quantified(quantifier, vars, rewrite_surface(body));
            }
            Term::List(items.iter().map(rewrite_surface).collect())
        }
    }
}

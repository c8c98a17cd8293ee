use std::collections::HashMap;

use crate::term::{Term, is_row_variable_name, is_variable_name};

pub const VAR_PREFIX: &str = "?VAR";
pub const ROW_VAR_PREFIX: &str = "@VAR";
pub const SKOLEM_PREFIX: &str = "Sk";
pub const SKOLEM_FN_PREFIX: &str = "SkFn";

/// Source of fresh variable names and Skolem symbols for one preprocessing run.
#[derive(Debug, Clone, Default)]
pub struct VarGen {
    counter: u32,
}

impl VarGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(counter: u32) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    fn next_index(&mut self) -> u32 {
        self.counter = if self.counter == u32::MAX {
            0
        } else {
            self.counter + 1
        };
        self.counter
    }

    pub fn new_variable(&mut self, prefix: &str) -> String {
        let idx = self.next_index();
        format!("{prefix}{idx}")
    }

    fn fresh_like(&mut self, var: &str) -> String {
        if is_row_variable_name(var) {
            self.new_variable(ROW_VAR_PREFIX)
        } else {
            self.new_variable(VAR_PREFIX)
        }
    }

    pub fn new_skolem_term(&mut self, universals: &[String]) -> Term {
        let idx = self.next_index();
        if universals.is_empty() {
            return Term::atom(format!("{SKOLEM_PREFIX}{idx}"));
        }
        let mut items = Vec::with_capacity(universals.len() + 1);
        items.push(Term::atom(format!("{SKOLEM_FN_PREFIX}{idx}")));
        items.extend(universals.iter().map(|v| Term::atom(v.clone())));
        Term::List(items)
    }

    /// Rename every variable to a fresh one. Explicit quantifiers get a private
    /// copy of `scoped`; free variables share `top_level`.
    pub fn rename_variables(
        &mut self,
        term: &Term,
        top_level: &mut HashMap<String, String>,
        scoped: &HashMap<String, String>,
        renames: &mut RenameMap,
    ) -> Term {
        match term {
            Term::Atom(name) if is_variable_name(name) => {
                if let Some(new) = scoped.get(name) {
                    return Term::atom(new.clone());
                }
                if let Some(new) = top_level.get(name) {
                    return Term::atom(new.clone());
                }
                let new = self.fresh_like(name);
                top_level.insert(name.clone(), new.clone());
                renames.insert(new.clone(), name.clone());
                Term::atom(new)
            }
            Term::Atom(_) => term.clone(),
            Term::List(items) => {
                if term.is_quantified() {
                    let mut inner = scoped.clone();
                    let mut new_vars = Vec::new();
                    for var in term.quantified_vars() {
                        let new = self.fresh_like(var);
                        inner.insert(var.to_string(), new.clone());
                        renames.insert(new.clone(), var.to_string());
                        new_vars.push(new);
                    }
                    let body = self.rename_variables(&items[2], top_level, &inner, renames);
                    let quantifier = term.head().unwrap_or_default();
                    return Term::quantified(quantifier, new_vars, body);
                }
                Term::List(
                    items
                        .iter()
                        .map(|t| self.rename_variables(t, top_level, scoped, renames))
                        .collect(),
                )
            }
        }
    }
}

/// new -> old links accumulated across renaming passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    links: HashMap<String, String>,
}

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, new: String, old: String) {
        if new != old {
            self.links.insert(new, old);
        }
    }

    pub fn extend(&mut self, other: &RenameMap) {
        for (new, old) in &other.links {
            self.links.insert(new.clone(), old.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Follow new -> old links to the variable's original name. The walk is
    /// capped at the number of links, so a cyclic map still terminates.
    pub fn original_var(&self, var: &str) -> String {
        let mut current = var;
        for _ in 0..=self.links.len() {
            match self.links.get(current) {
                Some(prev) => current = prev.as_str(),
                None => break,
            }
        }
        current.to_string()
    }

    pub fn maps_back_to(&self, var: &str, original: &str) -> bool {
        var == original || self.original_var(var) == original
    }
}

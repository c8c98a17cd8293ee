use std::collections::{BTreeSet, HashMap};
use std::fmt;

pub const AND: &str = "and";
pub const OR: &str = "or";
pub const NOT: &str = "not";
pub const IMPLIES: &str = "=>";
pub const IFF: &str = "<=>";
pub const FORALL: &str = "forall";
pub const EXISTS: &str = "exists";
pub const TRUE: &str = "True";
pub const FALSE: &str = "False";

pub const VAR_SIGIL: char = '?';
pub const ROW_VAR_SIGIL: char = '@';

pub const LOGICAL_OPERATORS: [&str; 7] = [AND, OR, NOT, IMPLIES, IFF, FORALL, EXISTS];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Atom(String),
    List(Vec<Term>),
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn list(items: Vec<Term>) -> Self {
        Term::List(items)
    }

    pub fn app(head: &str, args: Vec<Term>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Term::atom(head));
        items.extend(args);
        Term::List(items)
    }

    pub fn not(inner: Term) -> Self {
        Term::app(NOT, vec![inner])
    }

    pub fn quantified(quantifier: &str, vars: Vec<String>, body: Term) -> Self {
        Term::app(
            quantifier,
            vec![Term::List(vars.into_iter().map(Term::Atom).collect()), body],
        )
    }

    pub fn car(&self) -> Option<&Term> {
        match self {
            Term::List(items) => items.first(),
            Term::Atom(_) => None,
        }
    }

    pub fn cdr(&self) -> Term {
        match self {
            Term::List(items) if !items.is_empty() => Term::List(items[1..].to_vec()),
            _ => Term::List(Vec::new()),
        }
    }

    pub fn cons(head: Term, tail: &Term) -> Term {
        let mut items = vec![head];
        match tail {
            Term::List(rest) => items.extend(rest.iter().cloned()),
            atom => items.push(atom.clone()),
        }
        Term::List(items)
    }

    pub fn list_length(&self) -> usize {
        match self {
            Term::List(items) => items.len(),
            Term::Atom(_) => 0,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Term::List(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Term::List(items) if items.is_empty())
    }

    pub fn elements(&self) -> &[Term] {
        match self {
            Term::List(items) => items,
            Term::Atom(_) => &[],
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Term::Atom(s) => Some(s),
            Term::List(_) => None,
        }
    }

    /// Head symbol of an application, if the head is an atom.
    pub fn head(&self) -> Option<&str> {
        self.car().and_then(Term::as_atom)
    }

    pub fn arg(&self, pos: usize) -> Option<&Term> {
        self.elements().get(pos)
    }

    pub fn args(&self) -> &[Term] {
        match self {
            Term::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    pub fn is_variable(&self) -> bool {
        self.as_atom().is_some_and(is_variable_name)
    }

    pub fn is_plain_variable(&self) -> bool {
        self.as_atom().is_some_and(|s| s.starts_with(VAR_SIGIL) && s.len() > 1)
    }

    pub fn is_row_variable(&self) -> bool {
        self.as_atom().is_some_and(is_row_variable_name)
    }

    pub fn is_quoted_string(&self) -> bool {
        self.as_atom()
            .is_some_and(|s| s.len() >= 2 && s.starts_with('"') && s.ends_with('"'))
    }

    pub fn is_skolem(&self) -> bool {
        match self {
            Term::Atom(s) => is_skolem_symbol(s),
            Term::List(items) => items.first().is_some_and(Term::is_skolem),
        }
    }

    pub fn is_logical_operator(&self) -> bool {
        self.as_atom().is_some_and(is_logical_operator)
    }

    pub fn is_quantified(&self) -> bool {
        self.head().is_some_and(is_quantifier) && self.list_length() == 3
    }

    /// Variables bound by `(forall (...) body)` / `(exists (...) body)`.
    pub fn quantified_vars(&self) -> Vec<&str> {
        if !self.is_quantified() {
            return Vec::new();
        }
        match self.arg(1) {
            Some(Term::List(vars)) => vars.iter().filter_map(Term::as_atom).collect(),
            Some(Term::Atom(v)) => vec![v.as_str()],
            None => Vec::new(),
        }
    }

    pub fn quantified_body(&self) -> Option<&Term> {
        if self.is_quantified() {
            self.arg(2)
        } else {
            None
        }
    }

    pub fn is_atomic_formula(&self) -> bool {
        match self {
            Term::Atom(_) => true,
            Term::List(_) => !self.head().is_some_and(is_logical_operator),
        }
    }

    pub fn contains(&self, needle: &Term) -> bool {
        if self == needle {
            return true;
        }
        self.elements().iter().any(|t| t.contains(needle))
    }

    pub fn contains_atom(&self, name: &str) -> bool {
        match self {
            Term::Atom(s) => s == name,
            Term::List(items) => items.iter().any(|t| t.contains_atom(name)),
        }
    }

    pub fn contains_quoted_string(&self) -> bool {
        match self {
            Term::Atom(_) => self.is_quoted_string(),
            Term::List(items) => items.iter().any(Term::contains_quoted_string),
        }
    }

    pub fn contains_skolem(&self) -> bool {
        match self {
            Term::Atom(s) => is_skolem_symbol(s),
            Term::List(items) => items.iter().any(Term::contains_skolem),
        }
    }

    pub fn contains_non_ascii(&self) -> bool {
        match self {
            Term::Atom(s) => !s.is_ascii(),
            Term::List(items) => items.iter().any(Term::contains_non_ascii),
        }
    }

    pub fn contains_variable(&self) -> bool {
        match self {
            Term::Atom(s) => is_variable_name(s),
            Term::List(items) => items.iter().any(Term::contains_variable),
        }
    }

    /// True if some application in the term has a variable in argument position 0.
    pub fn has_variable_head(&self) -> bool {
        match self {
            Term::Atom(_) => false,
            Term::List(items) => {
                items.first().is_some_and(Term::is_variable)
                    || items.iter().any(Term::has_variable_head)
            }
        }
    }

    /// Every variable (plain and row) in first-occurrence order.
    pub fn variables(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        self.walk_atoms(&mut |s| {
            if is_variable_name(s) && seen.insert(s.to_string()) {
                out.push(s.to_string());
            }
        });
        out
    }

    pub fn row_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.walk_atoms(&mut |s| {
            if is_row_variable_name(s) {
                out.insert(s.to_string());
            }
        });
        out
    }

    /// Variables not bound by an enclosing explicit quantifier, in first-occurrence order.
    pub fn free_variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut bound = Vec::new();
        collect_free(self, &mut bound, &mut out);
        out
    }

    fn walk_atoms(&self, f: &mut impl FnMut(&str)) {
        match self {
            Term::Atom(s) => f(s),
            Term::List(items) => {
                for item in items {
                    item.walk_atoms(f);
                }
            }
        }
    }

    /// Replace free occurrences of `var`; a quantifier re-binding `var` shields its body.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Term {
        match self {
            Term::Atom(s) if s == var => replacement.clone(),
            Term::Atom(_) => self.clone(),
            Term::List(items) => {
                if self.quantified_vars().contains(&var) {
                    return self.clone();
                }
                Term::List(
                    items
                        .iter()
                        .map(|t| t.substitute(var, replacement))
                        .collect(),
                )
            }
        }
    }

    pub fn substitute_all(&self, bindings: &HashMap<String, Term>) -> Term {
        match self {
            Term::Atom(s) => bindings.get(s).cloned().unwrap_or_else(|| self.clone()),
            Term::List(items) => Term::List(items.iter().map(|t| t.substitute_all(bindings)).collect()),
        }
    }

    /// Splice `replacement` in place of every occurrence of the row variable `row_var`.
    pub fn splice_row_variable(&self, row_var: &str, replacement: &[Term]) -> Term {
        match self {
            Term::Atom(_) => self.clone(),
            Term::List(items) => {
                let mut out = Vec::with_capacity(items.len() + replacement.len());
                for item in items {
                    if item.as_atom() == Some(row_var) {
                        out.extend(replacement.iter().cloned());
                    } else {
                        out.push(item.splice_row_variable(row_var, replacement));
                    }
                }
                Term::List(out)
            }
        }
    }

    pub fn map_atoms(&self, f: &impl Fn(&str) -> String) -> Term {
        match self {
            Term::Atom(s) => Term::Atom(f(s)),
            Term::List(items) => Term::List(items.iter().map(|t| t.map_atoms(f)).collect()),
        }
    }
}

fn collect_free(term: &Term, bound: &mut Vec<String>, out: &mut Vec<String>) {
    match term {
        Term::Atom(s) => {
            if is_variable_name(s) && !bound.iter().any(|b| b == s) && !out.iter().any(|o| o == s)
            {
                out.push(s.clone());
            }
        }
        Term::List(items) => {
            if term.is_quantified() {
                let vars: Vec<String> = term
                    .quantified_vars()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                let depth = bound.len();
                bound.extend(vars);
                if let Some(body) = term.quantified_body() {
                    collect_free(body, bound, out);
                }
                bound.truncate(depth);
            } else {
                for item in items {
                    collect_free(item, bound, out);
                }
            }
        }
    }
}

pub fn is_variable_name(s: &str) -> bool {
    s.len() > 1 && (s.starts_with(VAR_SIGIL) || s.starts_with(ROW_VAR_SIGIL))
}

pub fn is_row_variable_name(s: &str) -> bool {
    s.len() > 1 && s.starts_with(ROW_VAR_SIGIL)
}

pub fn is_logical_operator(s: &str) -> bool {
    LOGICAL_OPERATORS.contains(&s)
}

pub fn is_quantifier(s: &str) -> bool {
    s == FORALL || s == EXISTS
}

pub fn is_skolem_symbol(s: &str) -> bool {
    let rest = if let Some(rest) = s.strip_prefix(crate::variables::SKOLEM_FN_PREFIX) {
        rest
    } else if let Some(rest) = s.strip_prefix(crate::variables::SKOLEM_PREFIX) {
        rest
    } else {
        return false;
    };
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(s) => write!(f, "{s}"),
            Term::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

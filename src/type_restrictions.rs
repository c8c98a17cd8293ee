use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::kb::{ENTITY_CLASS, KbOracle};
use crate::term::{AND, EXISTS, FORALL, IMPLIES, Term, is_logical_operator};

const SUBRELATION: &str = "subrelation";
const EQUAL: &str = "equal";
const INSTANCE: &str = "instance";
const SUBCLASS: &str = "subclass";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Universal,
    Existential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfFrame {
    pub var: String,
    pub kind: QuantifierKind,
    pub instance_classes: Vec<String>,
    pub subclass_classes: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TypeShelf {
    frames: Vec<ShelfFrame>,
}

impl TypeShelf {
    /// Push one frame per variable; returns the mark to pass to `pop_scope`.
    pub fn push_scope(&mut self, vars: &[String], kind: QuantifierKind) -> usize {
        let mark = self.frames.len();
        self.frames.extend(vars.iter().map(|var| ShelfFrame {
            var: var.clone(),
            kind,
            instance_classes: Vec::new(),
            subclass_classes: Vec::new(),
        }));
        mark
    }

    pub fn pop_scope(&mut self, mark: usize) -> Vec<ShelfFrame> {
        self.frames.split_off(mark.min(self.frames.len()))
    }

    /// Record `class` on the innermost frame binding `var`. A trailing `+`
    /// records a subclass constraint.
    pub fn add_constraint(&mut self, var: &str, class: &str) -> bool {
        let Some(frame) = self.frames.iter_mut().rev().find(|f| f.var == var) else {
            return false;
        };
        let (bucket, name) = match class.strip_suffix('+') {
            Some(base) => (&mut frame.subclass_classes, base),
            None => (&mut frame.instance_classes, class),
        };
        if !bucket.iter().any(|c| c == name) {
            bucket.push(name.to_string());
        }
        true
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeConstraints {
    pub instance_classes: Vec<String>,
    pub subclass_classes: Vec<String>,
}

impl TypeConstraints {
    fn add(&mut self, class: &str) {
        let (bucket, name) = match class.strip_suffix('+') {
            Some(base) => (&mut self.subclass_classes, base),
            None => (&mut self.instance_classes, class),
        };
        if !bucket.iter().any(|c| c == name) {
            bucket.push(name.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instance_classes.is_empty() && self.subclass_classes.is_empty()
    }
}

pub fn add_explicit_quantifiers(term: &Term) -> Term {
    let free = term.free_variables();
    if free.is_empty() {
        term.clone()
    } else {
        Term::quantified(FORALL, free, term.clone())
    }
}

/// Declared type of argument `pos` of `relation`, searching the `subrelation`
/// closure breadth-first. Results, including absence, are memoized in the
/// KB's sortal type cache.
pub fn find_type(kb: &dyn KbOracle, relation: &str, pos: usize) -> Option<String> {
    let key = format!("findType:{relation}:{pos}");
    kb.sortal_type_cache()
        .get_or_compute(&key, || search_type(kb, relation, pos))
}

fn search_type(kb: &dyn KbOracle, relation: &str, pos: usize) -> Option<String> {
    let mut seen = HashSet::from([relation.to_string()]);
    let mut queue = VecDeque::from([relation.to_string()]);
    while let Some(current) = queue.pop_front() {
        if let Some(ty) = kb.arg_type(&current, pos) {
            if ty != ENTITY_CLASS && ty != format!("{ENTITY_CLASS}+") {
                return Some(ty);
            }
        }
        for parent in kb.ask_with_restriction(&[(0, SUBRELATION), (1, current.as_str())]) {
            if let Some(name) = parent.arg(2).and_then(Term::as_atom) {
                if seen.insert(name.to_string()) {
                    queue.push_back(name.to_string());
                }
            }
        }
    }
    None
}

/// Keep only the most specific classes: drop any class that is a superclass of
/// another class in the list.
pub fn winnow_type_list(types: &[String], kb: &dyn KbOracle) -> Vec<String> {
    let mut unique: Vec<&str> = Vec::new();
    for ty in types {
        if !unique.contains(&ty.as_str()) {
            unique.push(ty);
        }
    }
    unique
        .iter()
        .filter(|ty| !unique.iter().any(|other| kb.is_subclass(other, ty)))
        .map(|ty| ty.to_string())
        .collect()
}

pub fn add_type_restrictions(term: &Term, kb: &dyn KbOracle) -> Term {
    let explicit = add_explicit_quantifiers(term);
    let mut shelf = TypeShelf::default();
    restrict(&explicit, kb, &mut shelf)
}

fn restrict(term: &Term, kb: &dyn KbOracle, shelf: &mut TypeShelf) -> Term {
    let Term::List(items) = term else {
        return term.clone();
    };
    if let (Some(quantifier), Some(body)) = (term.head(), term.quantified_body()) {
        let kind = if quantifier == FORALL {
            QuantifierKind::Universal
        } else {
            QuantifierKind::Existential
        };
        let vars: Vec<String> = term
            .quantified_vars()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mark = shelf.push_scope(&vars, kind);
        let body = restrict(body, kb, shelf);
        let frames = shelf.pop_scope(mark);
        let constraints = constraint_literals(&frames, kb);
        return wrap(kind, vars, constraints, body);
    }
    match term.head() {
        Some(head) if is_logical_operator(head) => {
            Term::List(items.iter().map(|t| restrict(t, kb, shelf)).collect())
        }
        Some(_) => {
            collect_constraints(term, kb, shelf);
            term.clone()
        }
        None => Term::List(items.iter().map(|t| restrict(t, kb, shelf)).collect()),
    }
}

fn collect_constraints(term: &Term, kb: &dyn KbOracle, shelf: &mut TypeShelf) {
    let Some(relation) = term.head() else {
        return;
    };
    for (pos, arg) in term.elements().iter().enumerate().skip(1) {
        match arg {
            Term::Atom(var) if arg.is_variable() => {
                if let Some(ty) = find_type(kb, relation, pos) {
                    trace!(var = %var, relation, pos, ty = %ty, "sortal constraint");
                    shelf.add_constraint(var, &ty);
                }
            }
            Term::List(_) => collect_constraints(arg, kb, shelf),
            Term::Atom(_) => {}
        }
    }
}

fn constraint_literals(frames: &[ShelfFrame], kb: &dyn KbOracle) -> Vec<Term> {
    let mut out = Vec::new();
    for frame in frames {
        for class in winnow_type_list(&frame.instance_classes, kb) {
            out.push(Term::app(INSTANCE, vec![Term::atom(&frame.var), Term::atom(class)]));
        }
        for class in winnow_type_list(&frame.subclass_classes, kb) {
            out.push(Term::app(SUBCLASS, vec![Term::atom(&frame.var), Term::atom(class)]));
        }
    }
    out
}

fn wrap(kind: QuantifierKind, vars: Vec<String>, mut constraints: Vec<Term>, body: Term) -> Term {
    match kind {
        QuantifierKind::Universal => {
            if constraints.is_empty() {
                return Term::quantified(FORALL, vars, body);
            }
            let antecedent = if constraints.len() == 1 {
                constraints.remove(0)
            } else {
                Term::app(AND, constraints)
            };
            Term::quantified(FORALL, vars, Term::app(IMPLIES, vec![antecedent, body]))
        }
        QuantifierKind::Existential => {
            if constraints.is_empty() {
                return Term::quantified(EXISTS, vars, body);
            }
            if body.head() == Some(AND) {
                constraints.extend(body.args().iter().cloned());
            } else {
                constraints.push(body);
            }
            Term::quantified(EXISTS, vars, Term::app(AND, constraints))
        }
    }
}

/// The types `var` must have according to every application it fills an
/// argument of, without a shelf. Functional terms on the other side of
/// `equal`, `instance` and `subclass` contribute their declared range.
pub fn compute_type_restrictions(var: &str, term: &Term, kb: &dyn KbOracle) -> TypeConstraints {
    let mut found = TypeConstraints::default();
    gather_var_types(var, term, kb, &mut found);
    TypeConstraints {
        instance_classes: winnow_type_list(&found.instance_classes, kb),
        subclass_classes: winnow_type_list(&found.subclass_classes, kb),
    }
}

fn gather_var_types(var: &str, term: &Term, kb: &dyn KbOracle, found: &mut TypeConstraints) {
    let Term::List(items) = term else {
        return;
    };
    if let Some(body) = term.quantified_body() {
        gather_var_types(var, body, kb, found);
        return;
    }
    if let Some(relation) = term.head().filter(|h| !is_logical_operator(h)) {
        let args = term.args();
        let is_var = |t: &Term| t.as_atom() == Some(var);
        let function_range = |t: &Term| t.head().and_then(|f| find_type(kb, f, 0));
        match (relation, args) {
            (EQUAL, [a, b]) if is_var(a) || is_var(b) => {
                let other = if is_var(a) { b } else { a };
                if let Some(range) = function_range(other) {
                    found.add(&range);
                }
            }
            (INSTANCE, [a, class]) if is_var(a) && class.is_list() => {
                if let Some(base) = function_range(class).as_deref().and_then(|r| r.strip_suffix('+')) {
                    found.add(base);
                }
            }
            (SUBCLASS, [a, class]) if is_var(a) && class.is_list() => {
                if let Some(base) = function_range(class).as_deref().and_then(|r| r.strip_suffix('+')) {
                    found.add(&format!("{base}+"));
                }
            }
            _ => {
                for (pos, arg) in items.iter().enumerate().skip(1) {
                    if is_var(arg) {
                        if let Some(ty) = find_type(kb, relation, pos) {
                            found.add(&ty);
                        }
                    }
                }
            }
        }
    }
    for item in items {
        gather_var_types(var, item, kb, found);
    }
}

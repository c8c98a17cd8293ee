use std::collections::HashMap;

use tracing::{debug, trace};

use crate::term::{AND, EXISTS, FALSE, FORALL, IFF, IMPLIES, NOT, OR, TRUE, Term};
use crate::variables::{RenameMap, VarGen};

/// One disjunctive clause split by polarity. Literals are kept in first-seen order
/// without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    pub negative: Vec<Term>,
    pub positive: Vec<Term>,
}

impl Clause {
    fn push_literal(&mut self, literal: &Term) {
        if literal.head() == Some(NOT) && literal.list_length() == 2 {
            push_unique(&mut self.negative, literal.elements()[1].clone());
        } else if literal.as_atom() == Some(FALSE) {
            push_unique(&mut self.negative, Term::atom(TRUE));
        } else {
            push_unique(&mut self.positive, literal.clone());
        }
    }

    pub fn literals(&self) -> impl Iterator<Item = &Term> {
        self.negative.iter().chain(self.positive.iter())
    }

    pub fn to_term(&self) -> Term {
        let mut disjuncts: Vec<Term> = self.negative.iter().cloned().map(Term::not).collect();
        disjuncts.extend(self.positive.iter().cloned());
        match disjuncts.len() {
            0 => Term::atom(FALSE),
            1 => disjuncts.remove(0),
            _ => Term::app(OR, disjuncts),
        }
    }
}

fn push_unique(items: &mut Vec<Term>, term: Term) {
    if !items.contains(&term) {
        items.push(term);
    }
}

#[derive(Debug, Clone)]
pub struct ClausalForm {
    pub term: Term,
    pub clauses: Vec<Clause>,
    pub renames: RenameMap,
}

impl ClausalForm {
    pub fn original_var(&self, var: &str) -> String {
        self.renames.original_var(var)
    }
}

/// Full clausification: CNF with Skolemization, clauses standardized apart.
pub fn clausify(term: &Term, vars: &mut VarGen) -> ClausalForm {
    let mut renames = RenameMap::new();
    let t = equivalences_out(term);
    let t = implications_out(&t);
    let t = negations_in(&t);
    let mut top_level = HashMap::new();
    let t = vars.rename_variables(&t, &mut top_level, &HashMap::new(), &mut renames);
    let t = existentials_out(&t, vars);
    let t = universals_out(&t);
    let t = disjunctions_in(&t);
    let t = standardize_apart(&t, vars, &mut renames);
    let clauses = extract_clauses(&t);
    debug!(input = %term, cnf = %t, clauses = clauses.len(), "clausified");
    ClausalForm {
        term: t,
        clauses,
        renames,
    }
}

pub fn equivalences_out(term: &Term) -> Term {
    match term {
        Term::Atom(_) => term.clone(),
        Term::List(items) => {
            let items: Vec<Term> = items.iter().map(equivalences_out).collect();
            if items.len() == 3 && items[0].as_atom() == Some(IFF) {
                let a = items[1].clone();
                let b = items[2].clone();
                return Term::app(
                    AND,
                    vec![
                        Term::app(IMPLIES, vec![a.clone(), b.clone()]),
                        Term::app(IMPLIES, vec![b, a]),
                    ],
                );
            }
            Term::List(items)
        }
    }
}

pub fn implications_out(term: &Term) -> Term {
    match term {
        Term::Atom(_) => term.clone(),
        Term::List(items) => {
            let items: Vec<Term> = items.iter().map(implications_out).collect();
            if items.len() == 3 && items[0].as_atom() == Some(IMPLIES) {
                return Term::app(OR, vec![Term::not(items[1].clone()), items[2].clone()]);
            }
            Term::List(items)
        }
    }
}

pub fn negations_in(term: &Term) -> Term {
    let mut current = term.clone();
    loop {
        let next = negations_in_step(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn negations_in_step(term: &Term) -> Term {
    let Term::List(items) = term else {
        return term.clone();
    };
    if items.len() == 2 && items[0].as_atom() == Some(NOT) {
        let inner = &items[1];
        if let Some(name) = inner.as_atom() {
            return match name {
                TRUE => Term::atom(FALSE),
                FALSE => Term::atom(TRUE),
                _ => term.clone(),
            };
        }
        let inner_items = inner.elements();
        match inner.head() {
            Some(NOT) if inner_items.len() == 2 => return negations_in_step(&inner_items[1]),
            Some(AND) => return de_morgan(OR, inner.args()),
            Some(OR) => return de_morgan(AND, inner.args()),
            Some(FORALL) if inner.is_quantified() => {
                return flip_quantifier(EXISTS, inner);
            }
            Some(EXISTS) if inner.is_quantified() => {
                return flip_quantifier(FORALL, inner);
            }
            _ => return term.clone(),
        }
    }
    Term::List(items.iter().map(negations_in_step).collect())
}

fn de_morgan(op: &str, args: &[Term]) -> Term {
    Term::app(
        op,
        args.iter()
            .map(|a| negations_in_step(&Term::not(a.clone())))
            .collect(),
    )
}

fn flip_quantifier(quantifier: &str, inner: &Term) -> Term {
    let items = inner.elements();
    Term::list(vec![
        Term::atom(quantifier),
        items[1].clone(),
        negations_in_step(&Term::not(items[2].clone())),
    ])
}

/// Replace existentially bound variables with Skolem terms over the universals in scope.
pub fn existentials_out(term: &Term, vars: &mut VarGen) -> Term {
    let mut universals = term.free_variables();
    skolemize(term, &mut universals, vars)
}

fn skolemize(term: &Term, universals: &mut Vec<String>, vars: &mut VarGen) -> Term {
    let Term::List(items) = term else {
        return term.clone();
    };
    if term.is_quantified() {
        let bound: Vec<String> = term
            .quantified_vars()
            .into_iter()
            .map(str::to_string)
            .collect();
        let body = &items[2];
        if term.head() == Some(FORALL) {
            let depth = universals.len();
            universals.extend(bound.iter().cloned());
            let body = skolemize(body, universals, vars);
            universals.truncate(depth);
            return Term::quantified(FORALL, bound, body);
        }
        let mut body = body.clone();
        for var in &bound {
            let sk = vars.new_skolem_term(universals);
            trace!(var = %var, skolem = %sk, "skolemized");
            body = body.substitute(var, &sk);
        }
        return skolemize(&body, universals, vars);
    }
    Term::List(
        items
            .iter()
            .map(|t| skolemize(t, universals, vars))
            .collect(),
    )
}

pub fn universals_out(term: &Term) -> Term {
    let Term::List(items) = term else {
        return term.clone();
    };
    if term.is_quantified() && term.head() == Some(FORALL) {
        return universals_out(&items[2]);
    }
    Term::List(items.iter().map(universals_out).collect())
}

pub fn disjunctions_in(term: &Term) -> Term {
    let mut current = flatten(term);
    loop {
        let next = flatten(&distribute_step(&current));
        if next == current {
            return next;
        }
        current = next;
    }
}

fn flatten(term: &Term) -> Term {
    let Term::List(items) = term else {
        return term.clone();
    };
    match term.head() {
        Some(op @ (AND | OR)) => {
            let mut args = Vec::new();
            for arg in &items[1..] {
                let arg = flatten(arg);
                if arg.head() == Some(op) {
                    args.extend(arg.args().iter().cloned());
                } else {
                    args.push(arg);
                }
            }
            if args.len() == 1 {
                args.remove(0)
            } else {
                Term::app(op, args)
            }
        }
        _ => Term::List(items.iter().map(flatten).collect()),
    }
}

fn distribute_step(term: &Term) -> Term {
    match term.head() {
        Some(AND) => Term::app(AND, term.args().iter().map(distribute_step).collect()),
        Some(OR) => {
            let args: Vec<Term> = term.args().iter().map(distribute_step).collect();
            let Some(idx) = args.iter().position(|a| a.head() == Some(AND)) else {
                return Term::app(OR, args);
            };
            let conjuncts = args[idx].args().to_vec();
            let conjoined = conjuncts
                .into_iter()
                .map(|c| {
                    let mut disjuncts = args.clone();
                    disjuncts[idx] = c;
                    Term::app(OR, disjuncts)
                })
                .collect();
            Term::app(AND, conjoined)
        }
        _ => term.clone(),
    }
}

/// Give every top-level conjunct its own variables.
pub fn standardize_apart(term: &Term, vars: &mut VarGen, renames: &mut RenameMap) -> Term {
    let mut rename_clause = |clause: &Term| {
        let mut top_level = HashMap::new();
        vars.rename_variables(clause, &mut top_level, &HashMap::new(), renames)
    };
    if term.head() == Some(AND) {
        Term::app(AND, term.args().iter().map(&mut rename_clause).collect())
    } else {
        rename_clause(term)
    }
}

pub fn extract_clauses(term: &Term) -> Vec<Clause> {
    let conjuncts: Vec<&Term> = if term.head() == Some(AND) {
        term.args().iter().collect()
    } else {
        vec![term]
    };
    if conjuncts.is_empty() {
        let mut trivial = Clause::default();
        trivial.push_literal(&Term::atom(TRUE));
        return vec![trivial];
    }
    conjuncts
        .into_iter()
        .map(|conjunct| {
            let mut clause = Clause::default();
            if conjunct.head() == Some(OR) {
                for literal in conjunct.args() {
                    clause.push_literal(literal);
                }
            } else {
                clause.push_literal(conjunct);
            }
            clause
        })
        .collect()
}

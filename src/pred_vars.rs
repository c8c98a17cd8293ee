use std::collections::{BTreeMap, BTreeSet};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::arity::check_arity;
use crate::clausifier::{ClausalForm, clausify};
use crate::kb::{KbOracle, QueryLiteral, RELATION_CLASS};
use crate::term::{AND, IMPLIES, TRUE, Term, is_logical_operator, is_variable_name};
use crate::variables::VarGen;

const HOLDS: &str = "holds";
const HOLDS_DURING: &str = "holdsDuring";
const KAPPA_FN: &str = "KappaFn";
const INSTANCE: &str = "instance";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredVarInfo {
    pub in_head_position: bool,
    pub types: BTreeSet<String>,
}

pub type PredVars = BTreeMap<String, PredVarInfo>;

type Bindings = BTreeMap<String, Term>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionTuple {
    pub var: String,
    pub simplifications: Vec<QueryLiteral>,
    pub key: QueryLiteral,
    pub answers: Vec<BTreeMap<String, Term>>,
}

impl SubstitutionTuple {
    pub fn values(&self) -> Vec<Term> {
        let mut seen = IndexSet::new();
        for row in &self.answers {
            if let Some(value) = row.get(&self.var) {
                seen.insert(value.clone());
            }
        }
        seen.into_iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredVarOutcome {
    Instantiated(Vec<Term>),
    NotApplicable,
    Rejected(String),
}

pub fn gather_pred_vars(term: &Term, kb: &dyn KbOracle) -> PredVars {
    let mut out = PredVars::new();
    gather(term, kb, &mut out);
    out
}

fn gather(term: &Term, kb: &dyn KbOracle, out: &mut PredVars) {
    let Term::List(items) = term else {
        return;
    };
    let Some(head) = items.first() else {
        return;
    };
    if let Some(var) = head.as_atom().filter(|_| head.is_variable()) {
        out.entry(var.to_string()).or_default().in_head_position = true;
        for arg in &items[1..] {
            gather(arg, kb, out);
        }
        return;
    }
    let Some(name) = head.as_atom() else {
        for item in items {
            gather(item, kb, out);
        }
        return;
    };
    if let Some(body) = term.quantified_body() {
        gather(body, kb, out);
        return;
    }
    match name {
        HOLDS_DURING | KAPPA_FN => {
            if let Some(inner) = term.arg(2) {
                gather(inner, kb, out);
            }
        }
        HOLDS => {
            let args = term.args();
            if let Some(var) = args.first().filter(|r| r.is_variable()).and_then(Term::as_atom) {
                out.entry(var.to_string()).or_default().in_head_position = true;
            }
            for arg in args.iter().skip(1) {
                gather(arg, kb, out);
            }
        }
        _ if is_logical_operator(name) => {
            for arg in &items[1..] {
                gather(arg, kb, out);
            }
        }
        _ => {
            let signature = kb.reln_arg_signature(name).unwrap_or_default();
            for (pos, arg) in items.iter().enumerate().skip(1) {
                let relation_valued = signature.get(pos).copied().unwrap_or(false);
                match arg.as_atom() {
                    Some(var) if arg.is_variable() && relation_valued => {
                        let info = out.entry(var.to_string()).or_default();
                        if let Some(ty) = kb.arg_type(name, pos).filter(|t| !t.ends_with('+')) {
                            info.types.insert(ty);
                        }
                    }
                    _ => gather(arg, kb, out),
                }
            }
        }
    }
}

/// Candidate query templates for `var`: negative literals first, positive ones
/// only if no negative literal qualifies, then any type hints.
pub fn gather_pred_var_query_lits(
    clausal: &ClausalForm,
    var: &str,
    info: &PredVarInfo,
    kb: &dyn KbOracle,
) -> Vec<QueryLiteral> {
    let mut out: Vec<QueryLiteral> = Vec::new();
    let negatives = clausal.clauses.iter().flat_map(|c| c.negative.iter());
    for lit in negatives.filter_map(|l| qualifying_literal(l, var, clausal, kb)) {
        if !out.contains(&lit) {
            out.push(lit);
        }
    }
    if out.is_empty() {
        let positives = clausal.clauses.iter().flat_map(|c| c.positive.iter());
        for lit in positives.filter_map(|l| qualifying_literal(l, var, clausal, kb)) {
            if !out.contains(&lit) {
                out.push(lit);
            }
        }
    }
    for ty in &info.types {
        let hint = QueryLiteral::new(INSTANCE, vec![Term::atom(var), Term::atom(ty.clone())]);
        if ty != RELATION_CLASS && !out.contains(&hint) {
            out.push(hint);
        }
    }
    out
}

fn qualifying_literal(
    literal: &Term,
    var: &str,
    clausal: &ClausalForm,
    kb: &dyn KbOracle,
) -> Option<QueryLiteral> {
    let original = literal.map_atoms(&|name: &str| {
        if is_variable_name(name) {
            clausal.original_var(name)
        } else {
            name.to_string()
        }
    });
    let head = original.car()?;
    let relation = head.as_atom()?;
    if head.is_variable() {
        return None;
    }
    if relation != INSTANCE && kb.reln_arg_signature(relation).is_none() {
        return None;
    }
    if original.contains_skolem() {
        return None;
    }
    let args = original.args();
    if !args.iter().any(|a| a.as_atom() == Some(var)) {
        return None;
    }
    if relation == INSTANCE
        && args.len() == 2
        && args[0].as_atom() == Some(var)
        && args[1].as_atom() == Some(RELATION_CLASS)
    {
        return None;
    }
    QueryLiteral::from_term(&original)
}

/// Ask each template in turn, most variables first and `instance` templates last.
/// The first satisfiable template becomes the key; every later satisfiable one
/// narrows the key's answers by an equality join on shared variables.
pub fn compute_substitution_tuples(
    kb: &dyn KbOracle,
    var: &str,
    mut templates: Vec<QueryLiteral>,
) -> Option<SubstitutionTuple> {
    templates.sort_by(|a, b| {
        let a_inst = a.relation == INSTANCE;
        let b_inst = b.relation == INSTANCE;
        a_inst
            .cmp(&b_inst)
            .then_with(|| b.variables().len().cmp(&a.variables().len()))
    });

    let mut key: Option<QueryLiteral> = None;
    let mut rows: Vec<BTreeMap<String, Term>> = Vec::new();
    let mut used = Vec::new();
    for template in templates {
        let bindings: Vec<BTreeMap<String, Term>> = kb
            .ask_with_literal(&template)
            .iter()
            .filter_map(|answer| template.bindings(answer))
            .filter(|row| row.get(var).is_some_and(|v| v.as_atom().is_some() && !v.is_variable()))
            .collect();
        if bindings.is_empty() {
            trace!(template = ?template.to_strings(), "unsatisfiable template");
            continue;
        }
        if key.is_none() {
            key = Some(template.clone());
            rows = bindings;
        } else {
            rows.retain(|row| bindings.iter().any(|other| agrees(row, other)));
        }
        used.push(template);
    }

    let key = key?;
    if rows.is_empty() {
        return None;
    }
    Some(SubstitutionTuple {
        var: var.to_string(),
        simplifications: used,
        key,
        answers: rows,
    })
}

fn agrees(row: &Bindings, other: &Bindings) -> bool {
    other
        .iter()
        .all(|(name, value)| row.get(name).is_none_or(|v| v == value))
}

/// Matched literals that are ground under `bindings` and hold in the KB.
fn confirmed_literals(
    literals: &[&QueryLiteral],
    bindings: &Bindings,
    kb: &dyn KbOracle,
) -> Vec<Term> {
    let mut out = Vec::new();
    for literal in literals {
        let mut ground = literal.to_term();
        for (var, value) in bindings {
            ground = ground.substitute(var, value);
        }
        if ground.contains_variable() || out.contains(&ground) {
            continue;
        }
        let holds = QueryLiteral::from_term(&ground)
            .is_some_and(|q| !kb.ask_with_literal(&q).is_empty());
        if holds {
            out.push(ground);
        }
    }
    out
}

pub fn instantiate_pred_vars(term: &Term, kb: &dyn KbOracle, vars: &mut VarGen) -> PredVarOutcome {
    let logical_head = term.head().is_some_and(is_logical_operator);
    if !logical_head || !term.has_variable_head() {
        return PredVarOutcome::NotApplicable;
    }
    let pred_vars = gather_pred_vars(term, kb);
    if !pred_vars.values().any(|info| info.in_head_position) {
        return PredVarOutcome::NotApplicable;
    }

    let clausal = clausify(term, vars);
    let mut tuples = Vec::new();
    for (var, info) in &pred_vars {
        let templates = gather_pred_var_query_lits(&clausal, var, info, kb);
        let tuple = if templates.is_empty() {
            None
        } else {
            compute_substitution_tuples(kb, var, templates)
        };
        match tuple {
            Some(tuple) => tuples.push(tuple),
            None if info.in_head_position => {
                return PredVarOutcome::Rejected(format!(
                    "no instantiation found for predicate variable {var}"
                ));
            }
            None => trace!(var = %var, "relation-valued variable left uninstantiated"),
        }
    }
    tuples.sort_by_key(|t| t.answers.len());

    let mut live: IndexMap<Term, Bindings> = IndexMap::from([(term.clone(), Bindings::new())]);
    let mut simplifications: Vec<&QueryLiteral> = Vec::new();
    for tuple in &tuples {
        simplifications.extend(&tuple.simplifications);
        let mut next: IndexMap<Term, Bindings> = IndexMap::new();
        for (formula, settled) in &live {
            for row in tuple.answers.iter().filter(|row| agrees(settled, row)) {
                let mut bindings = settled.clone();
                let mut candidate = formula.clone();
                for (var, value) in row {
                    if !bindings.contains_key(var) {
                        candidate = bind_pred_var(&candidate, var, value);
                        bindings.insert(var.clone(), value.clone());
                    }
                }
                let removable = confirmed_literals(&simplifications, &bindings, kb);
                let candidate = simplify(&candidate, &removable);
                match check_arity(&candidate, &|r: &str| kb.valence(r)) {
                    Ok(()) => {
                        next.entry(candidate).or_insert(bindings);
                    }
                    Err(err) => trace!(candidate = %candidate, %err, "dropped instantiation"),
                }
            }
        }
        live = next;
    }
    let live: Vec<Term> = live.into_keys().collect();

    if live.is_empty() {
        return PredVarOutcome::Rejected(
            "no predicate variable instantiation survived joining and arity checking".to_string(),
        );
    }
    debug!(input = %term, outputs = live.len(), "instantiated predicate variables");
    PredVarOutcome::Instantiated(live)
}

/// Drop conjuncts equal to one of `removable`, looking through logical
/// operators, `holdsDuring` and `KappaFn`. An implication whose antecedent
/// is removed collapses to its consequent.
pub fn simplify(term: &Term, removable: &[Term]) -> Term {
    if removable.is_empty() {
        return term.clone();
    }
    let Term::List(items) = term else {
        return term.clone();
    };
    match term.head() {
        Some(AND) => {
            let mut kept: Vec<Term> = term
                .args()
                .iter()
                .filter(|arg| !removable.contains(arg))
                .map(|arg| simplify(arg, removable))
                .collect();
            match kept.len() {
                0 => Term::atom(TRUE),
                1 => kept.remove(0),
                _ => Term::app(AND, kept),
            }
        }
        Some(IMPLIES) if items.len() == 3 && removable.contains(&items[1]) => {
            simplify(&items[2], removable)
        }
        Some(head) if is_logical_operator(head) || head == HOLDS_DURING || head == KAPPA_FN => {
            let out: Vec<Term> = items.iter().map(|t| simplify(t, removable)).collect();
            if head == IMPLIES && out.len() == 3 && out[1].as_atom() == Some(TRUE) {
                return out[2].clone();
            }
            Term::List(out)
        }
        _ => term.clone(),
    }
}

/// Substitute `value` for `var`. If `var` is explicitly quantified rather than
/// free, the outermost binding is consumed; inner re-bindings stay untouched.
fn bind_pred_var(term: &Term, var: &str, value: &Term) -> Term {
    if term.free_variables().iter().any(|v| v == var) {
        return term.substitute(var, value);
    }
    consume_binding(term, var, value).0
}

fn consume_binding(term: &Term, var: &str, value: &Term) -> (Term, bool) {
    let Term::List(items) = term else {
        return (term.clone(), false);
    };
    let bound = term.quantified_vars();
    if bound.contains(&var) {
        let remaining: Vec<String> = bound
            .into_iter()
            .filter(|v| *v != var)
            .map(str::to_string)
            .collect();
        let body = items[2].substitute(var, value);
        let out = if remaining.is_empty() {
            body
        } else {
            Term::quantified(term.head().unwrap_or_default(), remaining, body)
        };
        return (out, true);
    }
    let mut done = false;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if done {
            out.push(item.clone());
        } else {
            let (rewritten, consumed) = consume_binding(item, var, value);
            done = consumed;
            out.push(rewritten);
        }
    }
    (Term::List(out), done)
}

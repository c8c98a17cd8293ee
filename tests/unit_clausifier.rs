mod support;

use kifprep::clausifier::{
    disjunctions_in, equivalences_out, existentials_out, implications_out, universals_out,
};
use kifprep::{Term, VarGen, clausify};
use support::term;

#[test]
fn biconditional_yields_two_clauses() {
    let mut vars = VarGen::new();
    let cnf = clausify(&term("(<=> A B)"), &mut vars);

    assert_eq!(cnf.clauses.len(), 2);
    assert_eq!(cnf.clauses[0].negative, vec![Term::atom("A")]);
    assert_eq!(cnf.clauses[0].positive, vec![Term::atom("B")]);
    assert_eq!(cnf.clauses[1].negative, vec![Term::atom("B")]);
    assert_eq!(cnf.clauses[1].positive, vec![Term::atom("A")]);
}

#[test]
fn outermost_existential_becomes_skolem_constant() {
    let mut vars = VarGen::new();
    let cnf = clausify(&term("(exists (?X) (P ?X))"), &mut vars);

    assert_eq!(cnf.clauses.len(), 1);
    let literal = &cnf.clauses[0].positive[0];
    assert!(!literal.contains_variable(), "unexpected variable in {literal}");
    let witness = literal.arg(1).expect("argument");
    assert!(witness.as_atom().is_some(), "expected a constant, got {witness}");
    assert!(witness.is_skolem());
}

#[test]
fn existential_under_universal_becomes_skolem_function() {
    let mut vars = VarGen::new();
    let cnf = clausify(&term("(forall (?Y) (exists (?X) (P ?X ?Y)))"), &mut vars);

    assert_eq!(cnf.clauses.len(), 1);
    let literal = &cnf.clauses[0].positive[0];
    let witness = literal.arg(1).expect("skolem argument");
    let universal = literal.arg(2).expect("universal argument");
    assert!(witness.is_list());
    assert!(witness.is_skolem());
    assert_eq!(witness.args(), std::slice::from_ref(universal));
    assert!(universal.is_variable());
    assert_eq!(cnf.original_var(universal.as_atom().expect("atom")), "?Y");
}

#[test]
fn clauses_do_not_share_variables() {
    let mut vars = VarGen::new();
    let cnf = clausify(&term("(and (p ?X) (q ?X))"), &mut vars);

    assert_eq!(cnf.clauses.len(), 2);
    let first = cnf.clauses[0].to_term().variables();
    let second = cnf.clauses[1].to_term().variables();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_ne!(first, second);
    assert_eq!(cnf.original_var(&first[0]), "?X");
    assert_eq!(cnf.original_var(&second[0]), "?X");
}

#[test]
fn implication_stages_rewrite_in_order() {
    let t = term("(<=> (p ?X) (q ?X))");
    let t = equivalences_out(&t);
    assert_eq!(
        t.to_string(),
        "(and (=> (p ?X) (q ?X)) (=> (q ?X) (p ?X)))"
    );
    let t = implications_out(&t);
    assert_eq!(
        t.to_string(),
        "(and (or (not (p ?X)) (q ?X)) (or (not (q ?X)) (p ?X)))"
    );
}

#[test]
fn universals_are_dropped_after_skolemization() {
    let mut vars = VarGen::new();
    let t = existentials_out(&term("(forall (?A) (exists (?B) (r ?A ?B)))"), &mut vars);
    assert_eq!(t.to_string(), "(forall (?A) (r ?A (SkFn1 ?A)))");
    assert_eq!(universals_out(&t).to_string(), "(r ?A (SkFn1 ?A))");
}

#[test]
fn distribution_flattens_nested_connectives() {
    let t = term("(or a (or b (and c (and d e))))");
    assert_eq!(
        disjunctions_in(&t).to_string(),
        "(and (or a b c) (or a b d) (or a b e))"
    );
}

#[test]
fn atomic_input_is_a_single_clause() {
    let mut vars = VarGen::new();
    let cnf = clausify(&term("(likes Fido Rex)"), &mut vars);
    assert_eq!(cnf.clauses.len(), 1);
    assert!(cnf.clauses[0].negative.is_empty());
    assert_eq!(cnf.clauses[0].positive, vec![term("(likes Fido Rex)")]);
}

#[test]
fn negated_quantifier_flips() {
    let mut vars = VarGen::new();
    let cnf = clausify(&term("(not (forall (?X) (p ?X)))"), &mut vars);
    assert_eq!(cnf.clauses.len(), 1);
    let literal = &cnf.clauses[0].negative[0];
    assert_eq!(literal.head(), Some("p"));
    assert!(literal.contains_skolem());
}

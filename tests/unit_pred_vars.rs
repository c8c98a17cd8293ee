mod support;

use kifprep::pred_vars::{
    compute_substitution_tuples, gather_pred_var_query_lits, gather_pred_vars, simplify,
};
use kifprep::{PredVarOutcome, QueryLiteral, Term, VarGen, clausify, instantiate_pred_vars};
use support::{SAMPLE_KB, kb_from, rendered, sample_kb, term};

fn instantiated(outcome: PredVarOutcome) -> Vec<String> {
    match outcome {
        PredVarOutcome::Instantiated(terms) => rendered(&terms),
        other => panic!("expected instantiation, got {other:?}"),
    }
}

#[test]
fn transitivity_schema_instantiates_per_relation() {
    let kb = sample_kb();
    let mut vars = VarGen::new();
    let schema = term(
        "(=> (and (instance ?REL TransitiveRelation) (?REL ?A ?B) (?REL ?B ?C)) (?REL ?A ?C))",
    );

    let out = instantiated(instantiate_pred_vars(&schema, &kb, &mut vars));

    assert_eq!(
        out,
        vec![
            "(=> (and (ancestor ?A ?B) (ancestor ?B ?C)) (ancestor ?A ?C))",
            "(=> (and (part ?A ?B) (part ?B ?C)) (part ?A ?C))",
        ]
    );
}

#[test]
fn later_templates_narrow_the_key_answers() {
    let kb = sample_kb();
    let mut vars = VarGen::new();
    let schema = term(
        "(=> (and (subrelation ?REL likes) (instance ?REL BinaryPredicate) (?REL ?A ?B)) (likes ?A ?B))",
    );

    let out = instantiated(instantiate_pred_vars(&schema, &kb, &mut vars));

    assert_eq!(out, vec!["(=> (loves ?A ?B) (likes ?A ?B))"]);
}

const DISJOINT_SUBRELATIONS: &str = r#"
(subrelation a b)
(subrelation c d)
(instance a BinaryPredicate)
(instance b BinaryPredicate)
(instance c BinaryPredicate)
(instance d BinaryPredicate)
"#;

#[test]
fn joined_predicate_variables_follow_answer_rows() {
    let kb = kb_from(&format!("{SAMPLE_KB}\n{DISJOINT_SUBRELATIONS}"));
    let mut vars = VarGen::new();
    let schema = term("(=> (and (subrelation ?R1 ?R2) (?R1 ?X ?Y)) (?R2 ?X ?Y))");

    let out = instantiated(instantiate_pred_vars(&schema, &kb, &mut vars));

    assert_eq!(
        out,
        vec![
            "(=> (loves ?X ?Y) (likes ?X ?Y))",
            "(=> (a ?X ?Y) (b ?X ?Y))",
            "(=> (c ?X ?Y) (d ?X ?Y))",
        ]
    );
}

#[test]
fn confirmed_join_literals_are_simplified_away() {
    let kb = kb_from(&format!("{SAMPLE_KB}\n{DISJOINT_SUBRELATIONS}"));
    let mut vars = VarGen::new();
    let schema = term(
        "(=> (and (subrelation ?R1 ?R2) (instance ?R1 BinaryPredicate) (?R1 ?X ?Y)) (?R2 ?X ?Y))",
    );

    let out = instantiated(instantiate_pred_vars(&schema, &kb, &mut vars));

    assert!(out.iter().all(|f| !f.contains("subrelation") && !f.contains("instance")), "{out:?}");
    assert!(!out.contains(&"(=> (a ?X ?Y) (d ?X ?Y))".to_string()));
    assert!(!out.contains(&"(=> (c ?X ?Y) (b ?X ?Y))".to_string()));
    assert_eq!(out.len(), 3);
}

#[test]
fn formulas_without_head_variables_are_not_applicable() {
    let kb = sample_kb();
    let mut vars = VarGen::new();

    let plain = term("(=> (likes ?X ?Y) (likes ?Y ?X))");
    assert_eq!(
        instantiate_pred_vars(&plain, &kb, &mut vars),
        PredVarOutcome::NotApplicable
    );

    let non_logical = term("(?REL Fido Rex)");
    assert_eq!(
        instantiate_pred_vars(&non_logical, &kb, &mut vars),
        PredVarOutcome::NotApplicable
    );
}

#[test]
fn unsatisfiable_schema_is_rejected() {
    let kb = sample_kb();
    let mut vars = VarGen::new();
    let schema = term("(=> (instance ?REL SymmetricRelation) (?REL ?A ?B))");

    let outcome = instantiate_pred_vars(&schema, &kb, &mut vars);

    assert!(matches!(outcome, PredVarOutcome::Rejected(ref msg) if msg.contains("?REL")));
}

#[test]
fn arity_failures_prune_every_candidate() {
    let kb = sample_kb();
    let mut vars = VarGen::new();
    let schema = term("(=> (instance ?REL BinaryPredicate) (?REL Fido Rex Spot))");

    let outcome = instantiate_pred_vars(&schema, &kb, &mut vars);

    assert!(matches!(outcome, PredVarOutcome::Rejected(_)), "{outcome:?}");
}

#[test]
fn explicitly_quantified_predicate_variable_is_consumed() {
    let kb = sample_kb();
    let mut vars = VarGen::new();
    let schema = term(
        "(forall (?REL ?X) (=> (instance ?REL TransitiveRelation) (?REL ?X ?X)))",
    );

    let out = instantiated(instantiate_pred_vars(&schema, &kb, &mut vars));

    assert_eq!(
        out,
        vec![
            "(forall (?X) (ancestor ?X ?X))",
            "(forall (?X) (part ?X ?X))",
        ]
    );
}

#[test]
fn gathering_records_head_positions_and_domain_types() {
    let kb = sample_kb();
    let found = gather_pred_vars(
        &term("(=> (subrelation ?SUB ?SUPER) (holdsDuring ?T (?SUB ?A ?B)))"),
        &kb,
    );

    let sub = &found["?SUB"];
    assert!(sub.in_head_position);
    assert!(sub.types.contains("Relation"));
    let sup = &found["?SUPER"];
    assert!(!sup.in_head_position);
    assert!(sup.types.contains("Relation"));
    assert!(!found.contains_key("?T"));
}

#[test]
fn holds_marks_its_first_argument_as_a_predicate_variable() {
    let kb = sample_kb();
    let found = gather_pred_vars(&term("(=> (holds ?P ?X) (likes ?X ?X))"), &kb);
    assert!(found["?P"].in_head_position);
}

#[test]
fn query_literals_prefer_negative_literals_and_skip_relation_hint() {
    let kb = sample_kb();
    let mut vars = VarGen::new();
    let schema = term("(=> (and (subrelation ?REL likes) (?REL ?A ?B)) (instance ?REL BinaryPredicate))");
    let found = gather_pred_vars(&schema, &kb);
    let cnf = clausify(&schema, &mut vars);

    let lits = gather_pred_var_query_lits(&cnf, "?REL", &found["?REL"], &kb);

    let rendered: Vec<String> = lits.iter().map(|l| l.to_term().to_string()).collect();
    assert_eq!(rendered, vec!["(subrelation ?REL likes)"]);
}

#[test]
fn substitution_tuple_intersects_answers() {
    let kb = sample_kb();
    let templates = vec![
        QueryLiteral::new("instance", vec![Term::atom("?R"), Term::atom("BinaryRelation")]),
        QueryLiteral::new("instance", vec![Term::atom("?R"), Term::atom("TransitiveRelation")]),
    ];

    let tuple = compute_substitution_tuples(&kb, "?R", templates).expect("tuple");

    let values: Vec<String> = tuple.values().iter().map(Term::to_string).collect();
    assert_eq!(values, vec!["ancestor", "part"]);
    assert_eq!(tuple.simplifications.len(), 2);
}

#[test]
fn simplify_drops_matched_conjuncts() {
    let removable = vec![term("(instance ?REL TransitiveRelation)")];
    let out = simplify(
        &term("(=> (and (instance ?REL TransitiveRelation) (?REL a b)) (?REL b a))"),
        &removable,
    );
    assert_eq!(out.to_string(), "(=> (?REL a b) (?REL b a))");

    let whole = simplify(
        &term("(=> (instance ?REL TransitiveRelation) (?REL a a))"),
        &removable,
    );
    assert_eq!(whole.to_string(), "(?REL a a)");
}

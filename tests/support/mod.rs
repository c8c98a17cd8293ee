#![allow(dead_code)]

use kifprep::{KnowledgeBase, Term, parse_term};

/// A small ontology slice: an arity-class hierarchy, an animal taxonomy, and
/// a handful of relations with declared argument types.
pub const SAMPLE_KB: &str = r#"
; arity classes
(subclass Predicate Relation)
(subclass BinaryRelation Relation)
(subclass BinaryPredicate BinaryRelation)
(subclass BinaryPredicate Predicate)
(subclass TransitiveRelation BinaryRelation)
(subclass VariableArityRelation Relation)
(subclass Function Relation)
(subclass UnaryFunction Function)

; taxonomy
(subclass Organism Entity)
(subclass Animal Organism)
(subclass Mammal Animal)
(subclass Dog Mammal)
(subclass Woman Animal)

; relations
(instance ancestor TransitiveRelation)
(instance part TransitiveRelation)
(instance likes BinaryPredicate)
(instance loves BinaryPredicate)
(subrelation loves likes)
(domain likes 1 Animal)
(domain likes 2 Entity)
(domain subrelation 1 Relation)
(domain subrelation 2 Relation)
(instance partition VariableArityRelation)
(valence holds__ 1)
(domainSubclass breeds 1 Animal)
(instance MotherFn UnaryFunction)
(range MotherFn Woman)
(instance KindFn UnaryFunction)
(rangeSubclass KindFn Animal)
"#;

pub fn sample_kb() -> KnowledgeBase {
    KnowledgeBase::from_kif(SAMPLE_KB).expect("sample kb should parse")
}

pub fn kb_from(src: &str) -> KnowledgeBase {
    KnowledgeBase::from_kif(src).expect("kb source should parse")
}

pub fn term(src: &str) -> Term {
    parse_term(src).expect("term should parse")
}

pub fn rendered(terms: &[Term]) -> Vec<String> {
    terms.iter().map(Term::to_string).collect()
}

/// Every application in `term` whose head is `relation`.
pub fn applications<'a>(term: &'a Term, relation: &str) -> Vec<&'a Term> {
    let mut out = Vec::new();
    collect(term, relation, &mut out);
    out
}

fn collect<'a>(term: &'a Term, relation: &str, out: &mut Vec<&'a Term>) {
    if term.head() == Some(relation) {
        out.push(term);
    }
    for item in term.elements() {
        collect(item, relation, out);
    }
}

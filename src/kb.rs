use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::diagnostics::Diagnostic;
use crate::parser::parse_kif;
use crate::term::{Term, is_logical_operator};

pub const RELATION_CLASS: &str = "Relation";
pub const ENTITY_CLASS: &str = "Entity";
pub const SET_OR_CLASS: &str = "SetOrClass";

const BUILTIN_VALENCES: [(&str, i32); 14] = [
    ("and", 0),
    ("or", 0),
    ("not", 1),
    ("=>", 2),
    ("<=>", 2),
    ("instance", 2),
    ("subclass", 2),
    ("subrelation", 2),
    ("domain", 3),
    ("domainSubclass", 3),
    ("range", 2),
    ("rangeSubclass", 2),
    ("valence", 2),
    ("equal", 2),
];

const ARITY_CLASSES: [(&str, i32); 13] = [
    ("VariableArityRelation", 0),
    ("UnaryFunction", 1),
    ("BinaryRelation", 2),
    ("BinaryPredicate", 2),
    ("BinaryFunction", 2),
    ("TernaryRelation", 3),
    ("TernaryPredicate", 3),
    ("TernaryFunction", 3),
    ("QuaternaryRelation", 4),
    ("QuaternaryPredicate", 4),
    ("QuaternaryFunction", 4),
    ("QuintaryRelation", 5),
    ("QuintaryPredicate", 5),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryLiteral {
    pub relation: String,
    pub args: Vec<Term>,
}

impl QueryLiteral {
    pub fn new(relation: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            relation: relation.into(),
            args,
        }
    }

    pub fn from_term(term: &Term) -> Option<Self> {
        let relation = term.head()?;
        Some(Self::new(relation, term.args().to_vec()))
    }

    pub fn to_term(&self) -> Term {
        Term::app(&self.relation, self.args.clone())
    }

    pub fn to_strings(&self) -> Vec<String> {
        let mut out = vec![self.relation.clone()];
        out.extend(self.args.iter().map(Term::to_string));
        out
    }

    pub fn variables(&self) -> Vec<String> {
        self.to_term().variables()
    }

    pub fn bindings(&self, answer: &Term) -> Option<BTreeMap<String, Term>> {
        if answer.head() != Some(self.relation.as_str()) || answer.args().len() != self.args.len()
        {
            return None;
        }
        let mut env = BTreeMap::new();
        for (pattern, value) in self.args.iter().zip(answer.args()) {
            if !unify(pattern, value, &mut env) {
                return None;
            }
        }
        Some(env)
    }
}

fn unify(pattern: &Term, value: &Term, env: &mut BTreeMap<String, Term>) -> bool {
    match pattern {
        Term::Atom(v) if pattern.is_variable() => {
            if let Some(bound) = env.get(v) {
                return bound == value;
            }
            env.insert(v.clone(), value.clone());
            true
        }
        Term::Atom(_) => pattern == value,
        Term::List(items) => {
            let Term::List(values) = value else {
                return false;
            };
            items.len() == values.len()
                && items.iter().zip(values).all(|(p, v)| unify(p, v, env))
        }
    }
}

/// Memo map shared by sortal computations (`find_type` results, synthesized
/// sortal facts). `None` values record a computed absence.
#[derive(Debug, Default)]
pub struct SortalTypeCache {
    entries: RefCell<HashMap<String, Option<String>>>,
}

impl SortalTypeCache {
    pub fn get(&self, key: &str) -> Option<Option<String>> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn insert(&self, key: impl Into<String>, value: Option<String>) {
        self.entries.borrow_mut().insert(key.into(), value);
    }

    pub fn get_or_compute(
        &self,
        key: &str,
        compute: impl FnOnce() -> Option<String>,
    ) -> Option<String> {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Read-only view of a knowledge base, as consumed by the preprocessing stages.
pub trait KbOracle {
    fn ask_with_literal(&self, literal: &QueryLiteral) -> Vec<Term>;

    /// Statements whose argument at each `pos` is the atom `value`.
    fn ask_with_restriction(&self, restrictions: &[(usize, &str)]) -> Vec<Term>;

    /// -1 unknown, 0 variable arity, otherwise the fixed argument count.
    fn valence(&self, relation: &str) -> i32;

    /// Per position, whether the argument must itself name a relation.
    fn reln_arg_signature(&self, relation: &str) -> Option<Vec<bool>>;

    /// Declared type of an argument; a trailing `+` means "subclass of".
    fn arg_type(&self, relation: &str, pos: usize) -> Option<String>;

    /// Strict, transitive subclass check.
    fn is_subclass(&self, sub: &str, sup: &str) -> bool;

    fn sortal_type_cache(&self) -> &SortalTypeCache;

    fn contains_formula(&self, formula: &Term) -> bool;
}

#[derive(Debug, Default)]
pub struct KnowledgeBase {
    formulas: Vec<Term>,
    known: HashSet<Term>,
    by_position: HashMap<(usize, String), Vec<usize>>,
    subclass_parents: HashMap<String, BTreeSet<String>>,
    instance_of: HashMap<String, BTreeSet<String>>,
    valences: HashMap<String, i32>,
    superclass_memo: RefCell<HashMap<String, BTreeSet<String>>>,
    sortal_cache: SortalTypeCache,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_kif(src: &str) -> Result<Self, Vec<Diagnostic>> {
        let mut kb = Self::new();
        for term in parse_kif(src)? {
            kb.tell(term);
        }
        Ok(kb)
    }

    pub fn tell(&mut self, term: Term) -> bool {
        if !self.known.insert(term.clone()) {
            return false;
        }
        let is_ground_atom =
            !term.contains_variable() && term.head().is_some_and(|h| !is_logical_operator(h));
        if is_ground_atom {
            self.index_statement(&term);
        }
        self.formulas.push(term);
        true
    }

    fn index_statement(&mut self, term: &Term) {
        let idx = self.formulas.len();
        for (pos, item) in term.elements().iter().enumerate() {
            if let Some(atom) = item.as_atom() {
                self.by_position
                    .entry((pos, atom.to_string()))
                    .or_default()
                    .push(idx);
            }
        }
        let args = term.args();
        let atom_arg = |i: usize| args.get(i).and_then(Term::as_atom).map(str::to_string);
        match (term.head(), atom_arg(0), atom_arg(1)) {
            (Some("subclass"), Some(sub), Some(sup)) => {
                self.subclass_parents.entry(sub).or_default().insert(sup);
                self.superclass_memo.borrow_mut().clear();
            }
            (Some("instance"), Some(inst), Some(class)) => {
                self.instance_of.entry(inst).or_default().insert(class);
            }
            (Some("valence"), Some(rel), Some(n)) => {
                if let Ok(n) = n.parse::<i32>() {
                    self.valences.insert(rel, n);
                }
            }
            _ => {}
        }
    }

    pub fn formulas(&self) -> &[Term] {
        &self.formulas
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn superclasses(&self, class: &str) -> BTreeSet<String> {
        if let Some(hit) = self.superclass_memo.borrow().get(class) {
            return hit.clone();
        }
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([class]);
        while let Some(current) = queue.pop_front() {
            if let Some(parents) = self.subclass_parents.get(current) {
                for parent in parents {
                    if parent != class && seen.insert(parent.clone()) {
                        queue.push_back(parent);
                    }
                }
            }
        }
        self.superclass_memo
            .borrow_mut()
            .insert(class.to_string(), seen.clone());
        seen
    }

    pub fn is_instance_of(&self, inst: &str, class: &str) -> bool {
        self.instance_of.get(inst).is_some_and(|classes| {
            classes
                .iter()
                .any(|c| c == class || self.is_subclass(c, class))
        })
    }

    pub fn instances_of(&self, class: &str) -> BTreeSet<String> {
        self.instance_of
            .keys()
            .filter(|inst| self.is_instance_of(inst, class))
            .cloned()
            .collect()
    }

    fn valence_from_classes(&self, relation: &str) -> Option<i32> {
        let classes = self.instance_of.get(relation)?;
        for class in classes {
            let mut candidates = vec![class.clone()];
            candidates.extend(self.superclasses(class));
            for candidate in candidates {
                if let Some((_, n)) = ARITY_CLASSES.iter().find(|(name, _)| *name == candidate) {
                    return Some(*n);
                }
            }
        }
        None
    }

    fn is_relation_class(&self, class: &str) -> bool {
        class == RELATION_CLASS || self.is_subclass(class, RELATION_CLASS)
    }

    fn declared_type(&self, predicate: &str, relation: &str, pos: Option<usize>) -> Option<String> {
        let pos_text = pos.map(|p| p.to_string());
        let mut restrictions = vec![(0, predicate), (1, relation)];
        if let Some(p) = &pos_text {
            restrictions.push((2, p.as_str()));
        }
        let class_pos = if pos.is_some() { 3 } else { 2 };
        self.ask_with_restriction(&restrictions)
            .iter()
            .find_map(|f| f.arg(class_pos).and_then(Term::as_atom).map(str::to_string))
    }
}

impl KbOracle for KnowledgeBase {
    fn ask_with_literal(&self, literal: &QueryLiteral) -> Vec<Term> {
        let mut answers: Vec<Term> = self
            .by_position
            .get(&(0, literal.relation.clone()))
            .into_iter()
            .flatten()
            .map(|&idx| &self.formulas[idx])
            .filter(|f| literal.bindings(f).is_some())
            .cloned()
            .collect();

        if literal.relation == "instance" && literal.args.len() == 2 {
            if let Some(class) = literal.args[1].as_atom().filter(|_| !literal.args[1].is_variable())
            {
                for inst in self.instances_of(class) {
                    let derived = Term::app("instance", vec![Term::atom(inst), Term::atom(class)]);
                    if literal.bindings(&derived).is_some() && !answers.contains(&derived) {
                        answers.push(derived);
                    }
                }
            }
        }
        answers
    }

    fn ask_with_restriction(&self, restrictions: &[(usize, &str)]) -> Vec<Term> {
        let Some(((first_pos, first_val), rest)) = restrictions.split_first() else {
            return Vec::new();
        };
        self.by_position
            .get(&(*first_pos, first_val.to_string()))
            .into_iter()
            .flatten()
            .map(|&idx| &self.formulas[idx])
            .filter(|f| {
                rest.iter()
                    .all(|(pos, val)| f.arg(*pos).and_then(Term::as_atom) == Some(*val))
            })
            .cloned()
            .collect()
    }

    fn valence(&self, relation: &str) -> i32 {
        if let Some(n) = self.valences.get(relation) {
            return *n;
        }
        if let Some((_, n)) = BUILTIN_VALENCES.iter().find(|(name, _)| *name == relation) {
            return *n;
        }
        self.valence_from_classes(relation).unwrap_or(-1)
    }

    fn reln_arg_signature(&self, relation: &str) -> Option<Vec<bool>> {
        let domains = self.ask_with_restriction(&[(0, "domain"), (1, relation)]);
        let valence = self.valence(relation);
        if domains.is_empty() && valence < 0 {
            return None;
        }
        let declared: Vec<(usize, String)> = domains
            .iter()
            .filter_map(|f| {
                let pos = f.arg(2)?.as_atom()?.parse::<usize>().ok()?;
                let class = f.arg(3)?.as_atom()?.to_string();
                Some((pos, class))
            })
            .collect();
        let len = declared
            .iter()
            .map(|(pos, _)| *pos)
            .max()
            .unwrap_or(0)
            .max(valence.max(0) as usize)
            + 1;
        let mut signature = vec![false; len];
        for (pos, class) in declared {
            if self.is_relation_class(&class) {
                signature[pos] = true;
            }
        }
        Some(signature)
    }

    fn arg_type(&self, relation: &str, pos: usize) -> Option<String> {
        let (plain, subclass, pos) = if pos == 0 {
            ("range", "rangeSubclass", None)
        } else {
            ("domain", "domainSubclass", Some(pos))
        };
        self.declared_type(plain, relation, pos).or_else(|| {
            self.declared_type(subclass, relation, pos)
                .map(|class| format!("{class}+"))
        })
    }

    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        sub != sup && self.superclasses(sub).contains(sup)
    }

    fn sortal_type_cache(&self) -> &SortalTypeCache {
        &self.sortal_cache
    }

    fn contains_formula(&self, formula: &Term) -> bool {
        self.known.contains(formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kb() -> KnowledgeBase {
        KnowledgeBase::from_kif(
            r#"
            (subclass BinaryPredicate Predicate)
            (subclass Predicate Relation)
            (subclass TransitiveRelation BinaryRelation)
            (subclass BinaryRelation Relation)
            (instance ancestor TransitiveRelation)
            (instance likes BinaryPredicate)
            (domain subrelation 1 Relation)
            (domain subrelation 2 Relation)
            "#,
        )
        .expect("kb parses")
    }

    #[test]
    fn valence_comes_from_arity_class_closure() {
        let kb = sample_kb();
        assert_eq!(kb.valence("ancestor"), 2);
        assert_eq!(kb.valence("likes"), 2);
        assert_eq!(kb.valence("unknownRel"), -1);
        assert_eq!(kb.valence("and"), 0);
    }

    #[test]
    fn instance_literal_answers_through_subclasses() {
        let kb = sample_kb();
        let lit = QueryLiteral::new("instance", vec![Term::atom("?R"), Term::atom("BinaryRelation")]);
        let answers = kb.ask_with_literal(&lit);
        assert!(answers.iter().any(|a| a.to_string() == "(instance ancestor BinaryRelation)"));
    }

    #[test]
    fn signature_marks_relation_positions() {
        let kb = sample_kb();
        assert_eq!(kb.reln_arg_signature("subrelation"), Some(vec![false, true, true]));
        assert_eq!(kb.reln_arg_signature("nothing"), None);
    }

    #[test]
    fn cache_records_absent_values() {
        let cache = SortalTypeCache::default();
        assert_eq!(cache.get_or_compute("k", || None), None);
        assert!(cache.contains_key("k"));
        assert_eq!(cache.get_or_compute("k", || Some("X".into())), None);
    }
}

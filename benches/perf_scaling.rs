use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kifprep::{
    Formula, KnowledgeBase, PreprocessConfig, Preprocessor, VarGen, clausify, expand_row_vars,
    parse_term,
};

fn bench_clausify_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("clausify/conjunct_scaling");
    for conjuncts in [4usize, 8, 16, 32] {
        let term = parse_term(&build_nested_rule(conjuncts)).expect("parse");
        group.bench_with_input(BenchmarkId::from_parameter(conjuncts), &term, |b, term| {
            b.iter(|| {
                let mut vars = VarGen::new();
                clausify(black_box(term), &mut vars)
            })
        });
    }
    group.finish();
}

fn bench_row_expansion_scaling(c: &mut Criterion) {
    let kb = KnowledgeBase::from_kif(&build_kb(8)).expect("kb");
    let mut group = c.benchmark_group("expand_row_vars/row_variable_scaling");
    for row_vars in [1usize, 2, 3] {
        let formula = Formula::parse(build_row_rule(row_vars));
        group.bench_with_input(BenchmarkId::from_parameter(row_vars), &formula, |b, formula| {
            b.iter(|| {
                let mut vars = VarGen::new();
                expand_row_vars(black_box(formula), &kb, &mut vars)
            })
        });
    }
    group.finish();
}

fn bench_pred_var_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess/relation_scaling");
    for relations in [8usize, 32, 128] {
        let kb = KnowledgeBase::from_kif(&build_kb(relations)).expect("kb");
        group.bench_with_input(BenchmarkId::from_parameter(relations), &kb, |b, kb| {
            b.iter(|| {
                let mut pre = Preprocessor::new(kb, PreprocessConfig::default());
                let mut formula = Formula::parse(
                    "(=> (and (instance ?REL TransitiveRelation) (?REL ?A ?B) (?REL ?B ?C)) (?REL ?A ?C))",
                );
                black_box(pre.preprocess(&mut formula, false))
            })
        });
    }
    group.finish();
}

fn build_nested_rule(conjuncts: usize) -> String {
    let body: Vec<String> = (0..conjuncts)
        .map(|i| format!("(or (p{i} ?X ?Y) (exists (?Z) (q{i} ?Z ?Y)))"))
        .collect();
    format!("(forall (?X ?Y) (=> (and {}) (r ?X ?Y)))", body.join(" "))
}

fn build_row_rule(row_vars: usize) -> String {
    let rows: Vec<String> = (0..row_vars).map(|i| format!("@ROW{i}")).collect();
    let joined = rows.join(" ");
    format!("(=> (rel0 ?X {joined}) (rel1 ?X {joined}))")
}

fn build_kb(relations: usize) -> String {
    let mut src = String::new();
    src.push_str("(subclass TransitiveRelation BinaryRelation)\n");
    for i in 0..relations {
        src.push_str(&format!("(instance rel{i} VariableArityRelation)\n"));
        src.push_str(&format!("(instance rel{i} TransitiveRelation)\n"));
    }
    src
}

criterion_group!(
    benches,
    bench_clausify_scaling,
    bench_row_expansion_scaling,
    bench_pred_var_scaling
);
criterion_main!(benches);

//! Benchmarks for parsing and evaluating patterns
//!
//! Run with: cargo bench --bench evaluate_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ziffers::{parse_expression, zparse, Options};

const PATTERNS: [(&str, &str); 5] = [
    ("melody", "q 0 2 4 e 5 6 h 7 | q _6 5 4 2"),
    ("subdivision", "w [0 [1 2] [3 [4 5]]] [6 7]"),
    ("repeats", "[: q 0 (1,5) [: e 2 ? :3] :4]"),
    ("list_operations", "(0 1 2 3)+(0 2)*(1 2) (0 2 4)@(0 1 2 1)"),
    ("harmony", "h i iv^maj7 v^7%1 vi^min7 q 024 _135"),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, pattern) in PATTERNS {
        group.bench_function(BenchmarkId::new("parse", name), |b| {
            b.iter(|| parse_expression(black_box(pattern)))
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for (name, pattern) in PATTERNS {
        group.bench_function(BenchmarkId::new("first_cycle", name), |b| {
            b.iter(|| zparse(black_box(pattern), Options::default().with_seed(7)))
        });
    }

    // Indexed access across 16 cycles re-evaluates the tree at every boundary
    group.bench_function("sixteen_cycles", |b| {
        b.iter(|| {
            let mut melody = zparse("q 0 <1 2 3> (0,6) [4 5]", Options::default().with_seed(7))
                .map_err(|e| e.to_string())?;
            let length = melody.len();
            melody.take(black_box(length * 16)).map_err(|e| e.to_string())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);

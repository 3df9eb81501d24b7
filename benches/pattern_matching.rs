/**
 * PatternStore Matching Performance Benchmarks
 *
 * DESIGN DECISION: Benchmark `match_text` at small/medium/large pattern-table sizes
 * WHY: §4.5 scans the full active pattern table per request via rayon; this must stay
 * well under the per-request budget even as the adaptive engine accumulates
 * synthesized patterns over the life of a process
 *
 * # Scenarios
 * - small (seed only, ~9 patterns): interactive / cold-start baseline
 * - medium (seed + 500 synthesized): a process that has been learning for a while
 * - large (seed + 5,000 synthesized): stress test approaching the attack-history bound
 */

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashSet;
use tbh_security_engine::adaptive::pattern_store::PatternStore;
use tbh_security_engine::Severity;

fn build_store(extra_patterns: usize) -> PatternStore {
    let mut store = PatternStore::with_seed_patterns();
    for i in 0..extra_patterns {
        store.synthesize_novel(
            &[format!("token{i}"), format!("marker{i}")],
            "novel_exploit",
            Severity::Medium,
            vec![],
            0.5,
        );
    }
    store
}

fn bench_match_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_store_match_text");
    let text = "please eval this payload and poke at __builtins__ for a benchmark run";
    let tags = HashSet::new();

    for size in [0usize, 500, 5_000] {
        let store = build_store(size);
        group.bench_with_input(BenchmarkId::from_parameter(store.len()), &store, |b, store| {
            b.iter(|| store.match_text(text, &tags, 0.5));
        });
    }

    group.finish();
}

fn bench_synthesize_novel(c: &mut Criterion) {
    c.bench_function("synthesize_novel_single_insert", |b| {
        b.iter_batched(
            || PatternStore::with_seed_patterns(),
            |mut store| {
                store.synthesize_novel(
                    &["eval".to_string(), "__builtins__".to_string()],
                    "novel_exploit",
                    Severity::Medium,
                    vec![],
                    0.7,
                )
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_match_text, bench_synthesize_novel);
criterion_main!(benches);

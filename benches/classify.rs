//! Policy benchmark: classification over a synthetic process table of the
//! size a busy desktop produces.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memprio::classify::{is_protected, PolicyContext, ProtectedSet};
use memprio::probe::ProcessRecord;
use std::collections::{HashMap, HashSet};

fn synthetic_table(n: usize) -> Vec<ProcessRecord> {
    (0..n)
        .map(|i| {
            let name = match i % 7 {
                0 => format!("worker_{i}"),
                1 => "zsh".to_string(),
                2 => format!("helper_{i}"),
                3 => "WindowServer".to_string(),
                4 => format!("indexer_{i}"),
                5 => "PyCharm Helper".to_string(),
                _ => format!("cache_{i}"),
            };
            ProcessRecord::new(1000 + i as u32, name, 50.0 + i as f64, 1.0, Some(1))
        })
        .collect()
}

fn bench_classify(c: &mut Criterion) {
    let table = synthetic_table(500);
    let names: HashMap<u32, String> = table.iter().map(|p| (p.pid, p.name.clone())).collect();
    let protected = ProtectedSet::from_pids([1, 42, 1003]);
    let exclusions: HashSet<u32> = [1100, 1200].into_iter().collect();
    let ctx = PolicyContext {
        protected: &protected,
        exclusions: &exclusions,
        foreground_app: Some("pycharm"),
        process_names: &names,
    };

    c.bench_function("classify_500_processes", |b| {
        b.iter(|| {
            let mut shielded = 0usize;
            for record in &table {
                if is_protected(black_box(record), &ctx) {
                    shielded += 1;
                }
            }
            black_box(shielded)
        })
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);

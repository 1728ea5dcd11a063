use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logseal_core::{Aggregator, AggregatorConfig, LookupStrategy, Tree, TreeConfig};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn synthetic_log(lines: usize) -> Vec<String> {
    (0..lines)
        .map(|i| {
            format!(
                "2024-03-{:02}T{:02}:{:02}:{:02}Z web-{} GET /api/items/{} 200 {}ms",
                i % 28 + 1,
                i % 24,
                i % 60,
                (i * 7) % 60,
                i % 5,
                i,
                i % 300
            )
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for size in SIZES {
        let log = synthetic_log(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("sequential", size), &log, |b, log| {
            b.iter(|| {
                let tree = Tree::from_events(TreeConfig::default(), log).expect("tree");
                black_box(tree.leaf_count())
            });
        });

        group.bench_with_input(BenchmarkId::new("aggregated", size), &log, |b, log| {
            b.iter(|| {
                let mut aggr = Aggregator::new(AggregatorConfig::default()).expect("aggregator");
                aggr.submit_chunk(log.iter().map(String::as_bytes));
                black_box(aggr.end_batch().expect("end batch").leaf_count())
            });
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let log = synthetic_log(10_000);

    for lookup in [LookupStrategy::Indexed, LookupStrategy::Search] {
        let tree =
            Tree::from_events(TreeConfig::default().lookup(lookup), &log).expect("tree");
        group.bench_function(BenchmarkId::new("is_valid_event", lookup), |b| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % log.len();
                black_box(tree.is_valid_event(&log[i]).expect("validate"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_validate);
criterion_main!(benches);

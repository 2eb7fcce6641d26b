//! Performance benchmarks for the edge IP tester
//!
//! Covers the CPU-bound stages: range expansion, result filtering, final
//! ranking and the moving-average speed estimator.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use edge_ip_tester::{
    download::{MovingAverage, ThroughputOutcome},
    models::{ProbeResult, RankedRecord},
    ranges::{AddressBlock, CandidateSampler, SamplingPolicy},
    ranking::{Ranker, ResultFilter},
};
use std::hint::black_box;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Deterministic probe results with a spread of loss and delay
fn create_sample_results(count: usize) -> Vec<ProbeResult> {
    (0..count)
        .map(|i| {
            let address = IpAddr::V4(Ipv4Addr::from(0x6810_0000u32 + i as u32));
            let received = 4 - (i % 5).min(4) as u32;
            let delay = Duration::from_millis(((i * 37) % 400) as u64 * received as u64);
            ProbeResult::new(address, 4, received, delay)
        })
        .collect()
}

fn benchmark_range_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_expansion");

    for (name, token, policy) in [
        ("ipv4_/12_sparse", "104.16.0.0/12", SamplingPolicy::Sparse),
        ("ipv4_/16_exhaustive", "104.16.0.0/16", SamplingPolicy::Exhaustive),
        ("ipv6_/112_sparse", "2606:4700::/112", SamplingPolicy::Sparse),
    ] {
        let block = AddressBlock::parse(token).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &block, |b, block| {
            b.iter(|| {
                let mut sampler = CandidateSampler::with_seed(policy, 443, 7);
                black_box(sampler.sample(black_box(block)))
            });
        });
    }

    group.finish();
}

fn benchmark_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtering");
    let filter = ResultFilter {
        min_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(250),
        max_loss: 0.25,
    };

    for size in [1_000usize, 10_000, 100_000] {
        let results = create_sample_results(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &results, |b, results| {
            b.iter(|| black_box(filter.apply(results.clone())));
        });
    }

    group.finish();
}

fn benchmark_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    let records: Vec<RankedRecord> = create_sample_results(10_000)
        .into_iter()
        .enumerate()
        .map(|(i, probe)| RankedRecord::with_speed(probe, ((i * 7919) % 50_000) as f64 * 1024.0))
        .collect();

    group.bench_function("by_speed", |b| {
        b.iter(|| black_box(Ranker::new().rank(ThroughputOutcome::Qualified(records.clone()))));
    });
    group.bench_function("by_delay", |b| {
        b.iter(|| black_box(Ranker::new().rank(ThroughputOutcome::Skipped(records.clone()))));
    });

    group.finish();
}

fn benchmark_moving_average(c: &mut Criterion) {
    c.bench_function("moving_average_100_slices", |b| {
        b.iter(|| {
            let mut average = MovingAverage::new();
            for slice in 0..100 {
                average.add(black_box(1_048_576.0 + slice as f64));
            }
            black_box(average.value())
        });
    });
}

criterion_group!(
    benches,
    benchmark_range_expansion,
    benchmark_filtering,
    benchmark_ranking,
    benchmark_moving_average
);

criterion_main!(benches);

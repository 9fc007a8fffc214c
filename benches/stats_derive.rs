use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kafka_producer_bench::{derive_rates, RawStatsSnapshot, StatsCheckpoint};

fn snapshot_json(brokers: usize, topics: usize) -> String {
    let brokers: Vec<String> = (0..brokers)
        .map(|i| {
            format!(
                r#""broker{}": {{"int_latency": {{"avg": 1500}}, "rtt": {{"avg": 3200}}, "req": {{"Produce": {}}}}}"#,
                i,
                1_000 + i
            )
        })
        .collect();
    let topics: Vec<String> = (0..topics)
        .map(|i| format!(r#""sample_{}": {{"batchsize": {{"avg": 4096}}}}"#, i))
        .collect();
    format!(
        r#"{{"txmsgs": 1000000, "ts": 60000000, "topics": {{{}}}, "brokers": {{{}}}}}"#,
        topics.join(", "),
        brokers.join(", ")
    )
}

fn bench_stats(c: &mut Criterion) {
    let raw = snapshot_json(6, 50);

    c.bench_function("parse_statistics_report", |b| {
        b.iter(|| RawStatsSnapshot::from_slice(black_box(raw.as_bytes())))
    });

    let snapshot = RawStatsSnapshot::from_slice(raw.as_bytes()).expect("valid report");
    c.bench_function("derive_rates", |b| {
        b.iter(|| {
            let mut checkpoint = StatsCheckpoint {
                last_sample_timestamp_secs: 59.0,
                last_total_messages: 990_000.0,
                last_request_count: 900.0,
            };
            derive_rates(black_box(&snapshot), &mut checkpoint)
        })
    });
}

criterion_group!(benches, bench_stats);
criterion_main!(benches);

use std::fs::File;
use std::io::Read;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use csim_core::geometry::Geometry;
use csim_core::simulator::Simulator;
use csim_core::util::get_test_cases;

/// A strided store/load sweep large enough to keep every set busy
fn synthetic_trace(records: u64) -> Vec<u8> {
    let mut trace = String::new();
    for i in 0..records {
        let kind = if i % 3 == 0 { 'S' } else { 'L' };
        let address = (i * 72) % (1 << 20);
        trace.push_str(&format!("{kind} {address:x},8\n"));
    }
    trace.into_bytes()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Examples");

    get_test_cases()
        .unwrap()
        .iter()
        .for_each(|case| {
            let mut trace_file = File::open(&case.trace).unwrap();
            let mut buf = Vec::new();
            // Ignore IO effects, the bundled traces are tiny
            trace_file.read_to_end(&mut buf).unwrap();
            group.bench_with_input(BenchmarkId::new("Example", case.output.display()), &(case.geometry, buf), |bench, (geometry, buf)| {
                bench.iter(|| {
                    Simulator::new(*geometry).unwrap().simulate(buf.as_slice()).unwrap();
                });
            });
        });

    let trace = synthetic_trace(200_000);
    for (s, e, b) in [(0, 1, 4), (5, 1, 5), (5, 4, 5), (0, 64, 6)] {
        let geometry = Geometry::new(s, e, b).unwrap();
        group.bench_with_input(BenchmarkId::new("Synthetic", format!("s{s}-E{e}-b{b}")), &geometry, |bench, geometry| {
            bench.iter(|| {
                Simulator::new(*geometry).unwrap().simulate(trace.as_slice()).unwrap();
            });
        });
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = criterion_benchmark
);
criterion_main!(benches);

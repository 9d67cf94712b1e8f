//! Performance benchmarks for the routing engine
//!
//! Run with: cargo bench
//!
//! Targets:
//! - Full evaluate on a quiet client: < 10μs
//! - Full evaluate on a saturated window: < 50μs
//! - Sweep detection on a full sample: < 1μs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use decoy_gate::pattern::{PatternDetector, SweepDetector};
use decoy_gate::risk_model::{decoy_factory, AuthoritativeRiskModel};
use decoy_gate::{
    ClientIdentity, CredentialValidator, GatewayEngine, GatewayState, ManualClock, NumericFields,
    RequestRecord, Secret,
};

fn engine() -> GatewayEngine {
    let state = Arc::new(GatewayState::new(
        Duration::from_secs(60),
        Arc::new(ManualClock::new()),
    ));
    let validator: Arc<dyn CredentialValidator> =
        Arc::new(|secret: &Secret| secret.expose() == "bench-token");
    GatewayEngine::new(
        state,
        Arc::new(AuthoritativeRiskModel),
        decoy_factory(),
        validator,
    )
}

fn risk_input(volatility: f64) -> NumericFields {
    NumericFields::new()
        .with("volatility", volatility)
        .with("correlation", 0.3)
        .with("liquidity", 1.0)
}

// =============================================================================
// ENGINE BENCHMARKS
// =============================================================================

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluate");
    group.throughput(Throughput::Elements(1));

    // New client every iteration: map insert plus a one-record window
    group.bench_function("fresh_client", |b| {
        let engine = engine();
        let mut n: u64 = 0;
        b.iter(|| {
            n += 1;
            let client = ClientIdentity::from(format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff));
            engine.evaluate(black_box(&client), black_box(risk_input(0.5)), None)
        })
    });

    // Same client hammering: window grows, client ends up blocked on the decoy
    group.bench_function("saturated_client", |b| {
        let engine = engine();
        let client = ClientIdentity::from("203.0.113.1");
        let mut v = 0.0;
        b.iter(|| {
            v += 0.001;
            engine.evaluate(black_box(&client), black_box(risk_input(v)), None)
        })
    });

    group.bench_function("credentialed_client", |b| {
        let engine = engine();
        let client = ClientIdentity::from("192.0.2.1");
        let token = Secret::new("bench-token");
        b.iter(|| engine.evaluate(black_box(&client), black_box(risk_input(0.5)), Some(&token)))
    });

    group.finish();
}

// =============================================================================
// DETECTOR BENCHMARKS
// =============================================================================

fn bench_sweep_detector(c: &mut Criterion) {
    let mut group = c.benchmark_group("SweepDetector");
    let detector = SweepDetector::new();

    for size in [5usize, 10, 100] {
        let window: Vec<RequestRecord> = (0..size)
            .map(|i| RequestRecord {
                timestamp: Duration::from_millis(i as u64),
                input: risk_input((i as f64 * 0.37).sin()),
                credentialed: false,
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("is_systematic", size), &window, |b, w| {
            b.iter(|| detector.is_systematic(black_box(w)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_sweep_detector);
criterion_main!(benches);

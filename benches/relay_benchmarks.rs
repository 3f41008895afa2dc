use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crdt_relay::prelude::*;

fn bench_state_merge(c: &mut Criterion) {
    let states: Vec<ReplicaState> = (0..100u64)
        .map(|i| {
            let id = ReplicaId::new(i);
            let mut s = ReplicaState::with_own(id);
            s.bump_own_by(id, 100);
            s
        })
        .collect();

    c.bench_function("ReplicaState::merge_from 10 replicas", |b| {
        b.iter(|| {
            let mut merged = states[0].clone();
            for other in &states[1..10] {
                merged.merge_from(other);
            }
            black_box(merged.value())
        })
    });

    c.bench_function("ReplicaState::merge_from 100 replicas", |b| {
        b.iter(|| {
            let mut merged = states[0].clone();
            for other in &states[1..] {
                merged.merge_from(other);
            }
            black_box(merged.value())
        })
    });
}

fn bench_direct_fanout(c: &mut Criterion) {
    for size in [4usize, 32] {
        let registry = Registry::new();
        let replicas: Vec<_> = (0..size).map(|_| registry.register()).collect();
        c.bench_function(&format!("direct increment fan-out to {size}"), |b| {
            b.iter(|| {
                replicas[0].increment();
                black_box(replicas[size - 1].value())
            })
        });
    }
}

fn bench_mailbox_fanout(c: &mut Criterion) {
    let registry = Registry::builder().delivery(DeliveryMode::Mailbox).build();
    let replicas: Vec<_> = (0..8).map(|_| registry.register()).collect();
    c.bench_function("mailbox increment x100 + flush, 8 replicas", |b| {
        b.iter(|| {
            for _ in 0..100 {
                replicas[0].increment();
            }
            registry.flush().unwrap();
            black_box(replicas[7].value())
        })
    });
}

criterion_group!(
    benches,
    bench_state_merge,
    bench_direct_fanout,
    bench_mailbox_fanout
);
criterion_main!(benches);

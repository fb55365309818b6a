//! Benchmarks for message dispatch and entity table churn.

use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tessera_ecs::prelude::*;

struct Moved {
    dx: f32,
}

impl Message for Moved {
    fn kind(&self) -> &str {
        "Moved"
    }
}

fn bench_dispatch(c: &mut Criterion) {
    let bus = MessageBus::new();
    let total = Rc::new(Cell::new(0.0f32));
    for _ in 0..32 {
        let sink = total.clone();
        bus.listen_for::<Moved, _>("Moved", move |m| sink.set(sink.get() + m.dx));
    }

    c.bench_function("dispatch_32_handlers", |b| {
        b.iter(|| bus.dispatch(black_box(&Moved { dx: 1.0 })))
    });
}

fn bench_table_churn(c: &mut Criterion) {
    c.bench_function("table_insert_remove_500", |b| {
        b.iter(|| {
            let mut table = EntityTable::new();
            let ids: Vec<_> = (0..500).map(|_| EntityId::next()).collect();
            for (i, id) in ids.iter().enumerate() {
                let _ = table.insert(*id, i);
            }
            for id in ids.iter().rev() {
                table.remove(*id);
            }
            black_box(table.len())
        })
    });
}

criterion_group!(benches, bench_dispatch, bench_table_churn);
criterion_main!(benches);

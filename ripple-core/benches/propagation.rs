//! Propagation Benchmarks
//!
//! Measures notification fan-out through a single field and deep traversal
//! of nested observed data.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::observer::{observe, traverse, Array, Object, Value};
use ripple_core::reactive::{Watcher, WatcherOptions};

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for watchers in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(watchers), &watchers, |b, &n| {
            let obj = Object::from_iter([("a", 0)]);
            observe(&Value::from(obj.clone()), false);
            let _watchers: Vec<Watcher> = (0..n)
                .map(|_| Watcher::new(&obj, "a", None, WatcherOptions::default()))
                .collect();

            let mut tick = 0.0;
            b.iter(|| {
                tick += 1.0;
                obj.set("a", black_box(Value::from(tick))).ok();
            });
        });
    }
    group.finish();
}

fn nested(depth: usize, width: usize) -> Value {
    if depth == 0 {
        return Value::from(depth);
    }
    let children: Array = (0..width).map(|_| nested(depth - 1, width)).collect();
    Value::from(Object::from_iter([
        ("children", Value::from(children)),
        ("depth", Value::from(depth)),
    ]))
}

fn deep_traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_traverse");
    for depth in [2usize, 4, 6] {
        let tree = nested(depth, 3);
        observe(&tree, false);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &tree, |b, tree| {
            b.iter(|| traverse(black_box(tree)));
        });
    }
    group.finish();
}

criterion_group!(benches, fan_out, deep_traverse);
criterion_main!(benches);

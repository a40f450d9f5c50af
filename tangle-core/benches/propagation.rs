//! Build, propagate and re-evaluate a wide fan-out and a long chain.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use tangle_core::{Blueprint, Class, Object, Runtime};

const WIDTH: usize = 256;
const DEPTH: usize = 256;

struct FanOut {
    class: Class,
    source: Blueprint<u64>,
    total: Blueprint<u64>,
}

fn fan_out() -> FanOut {
    let class = Class::new("FanOut");
    let source = class.declare("source", Blueprint::<u64>::source()).unwrap();
    let leaves: Vec<Blueprint<u64>> = (0..WIDTH as u64)
        .map(|offset| Blueprint::map(&source, move |s: &u64| s + offset))
        .collect();
    let refs: Vec<&Blueprint<u64>> = leaves.iter().collect();
    let all = Blueprint::collect(&refs);
    let total = class
        .declare("total", Blueprint::map(&all, |values: &Vec<u64>| values.iter().sum::<u64>()))
        .unwrap();
    FanOut { class, source, total }
}

fn chain() -> (Class, Blueprint<u64>, Blueprint<u64>) {
    let class = Class::new("Chain");
    let source = class.declare("source", Blueprint::<u64>::source()).unwrap();
    let mut tip = Blueprint::map(&source, |s: &u64| s + 1);
    for _ in 1..DEPTH {
        tip = Blueprint::map(&tip, |s: &u64| s + 1);
    }
    (class, source, tip)
}

fn bench_build(c: &mut Criterion) {
    let model = fan_out();
    let runtime = Runtime::new();
    c.bench_function("build_fan_out", |b| {
        b.iter_batched(
            || Object::plain(&model.class),
            |host| {
                black_box(runtime.get_or_build_node(&host, &model.total).unwrap());
                host
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_set_and_read(c: &mut Criterion) {
    let model = fan_out();
    let runtime = Runtime::new();
    let host = Object::plain(&model.class);
    runtime.set_value(&host, &model.source, 0).unwrap();
    runtime.value_of(&host, &model.total).unwrap();

    let mut next = 0_u64;
    c.bench_function("set_and_read_fan_out", |b| {
        b.iter(|| {
            next += 1;
            runtime.set_value(&host, &model.source, next).unwrap();
            black_box(runtime.value_of(&host, &model.total).unwrap())
        })
    });

    let (class, source, tip) = chain();
    let host = Object::plain(&class);
    runtime.set_value(&host, &source, 0).unwrap();
    runtime.value_of(&host, &tip).unwrap();

    c.bench_function("set_and_read_chain", |b| {
        b.iter(|| {
            next += 1;
            runtime.set_value(&host, &source, next).unwrap();
            black_box(runtime.value_of(&host, &tip).unwrap())
        })
    });
}

criterion_group!(benches, bench_build, bench_set_and_read);
criterion_main!(benches);

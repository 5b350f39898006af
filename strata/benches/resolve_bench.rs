use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata::{Instance, KeyPath};

fn populated(keys: usize) -> Instance {
    let config = Instance::new();
    for i in 0..keys {
        config
            .set_default(&format!("section{}.key{i}", i % 10), i as i64)
            .unwrap();
    }
    config.set_config_type("yaml");
    config
        .read_config(b"section0:\n  key0: file\nmysql:\n  addr: 127.0.0.1\n  port: 3306\n")
        .unwrap();
    config.set("mysql.port", 3307).unwrap();
    config
}

fn bench_key_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_path");

    group.bench_function("single_segment", |b| {
        b.iter(|| KeyPath::new(black_box("ContentDir")));
    });

    group.bench_function("nested", |b| {
        b.iter(|| KeyPath::new(black_box("Server.Http.Listen.Port")));
    });

    group.bench_function("custom_delimiter", |b| {
        b.iter(|| KeyPath::with_delimiter(black_box("server::http::port"), "::"));
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    let config = populated(100);

    // Override tier answers first
    group.bench_function("override_hit", |b| {
        b.iter(|| config.get(black_box("mysql.port")));
    });

    // Falls through override, flag and env to the file tier
    group.bench_function("file_hit", |b| {
        b.iter(|| config.get(black_box("mysql.addr")));
    });

    group.bench_function("default_hit", |b| {
        b.iter(|| config.get(black_box("section5.key55")));
    });

    group.bench_function("miss", |b| {
        b.iter(|| config.get(black_box("no.such.key")));
    });

    // Map hits merge the subtree across tiers
    group.bench_function("subtree", |b| {
        b.iter(|| config.get(black_box("mysql")));
    });

    group.bench_function("typed_int", |b| {
        b.iter(|| config.get_int(black_box("mysql.port")));
    });

    group.finish();
}

fn bench_all_settings(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_settings");

    for size in [10, 100, 1000] {
        let config = populated(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &config, |b, config| {
            b.iter(|| config.all_settings());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_key_path, bench_get, bench_all_settings);
criterion_main!(benches);

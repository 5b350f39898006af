use std::process::{Command, Stdio};

use assert_cmd::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::TempDir;

fn write_config(dir: &TempDir, keys: usize) {
    let mut content = String::from("mysql:\n  addr: 127.0.0.1\n  port: 3306\n");
    for i in 0..keys {
        content.push_str(&format!("key{i}: value{i}\n"));
    }
    std::fs::write(dir.path().join("strata.yaml"), content).expect("failed to write config");
}

fn strata(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("strata").expect("failed to locate strata binary");
    cmd.current_dir(dir.path()).env("HOME", dir.path());
    cmd
}

fn bench_cli_startup(c: &mut Criterion) {
    c.bench_function("cli_startup_version", |b| {
        b.iter(|| {
            let mut cmd = Command::cargo_bin("strata").expect("failed to locate strata binary");
            let output = cmd.arg("--version").output().expect("failed to run strata");
            black_box(output);
        });
    });
}

fn bench_cli_get(c: &mut Criterion) {
    c.bench_function("cli_get", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().expect("failed to create temp dir");
                write_config(&dir, 10);
                dir
            },
            |dir| {
                let mut cmd = strata(&dir);
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
                let status = cmd
                    .args(["--set", "mysql.port=4000", "get", "mysql.port"])
                    .status()
                    .expect("failed to execute strata get");
                black_box(status.success());
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_cli_dump(c: &mut Criterion) {
    c.bench_function("cli_dump_json", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().expect("failed to create temp dir");
                write_config(&dir, 500);
                dir
            },
            |dir| {
                let output = strata(&dir)
                    .args(["dump", "--format", "json"])
                    .output()
                    .expect("failed to execute strata dump");
                black_box(output);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(cli_benches, bench_cli_startup, bench_cli_get, bench_cli_dump);
criterion_main!(cli_benches);

//! Concurrent access tests for strata.
//!
//! An `Instance` is shared between threads through an `Arc`. These tests
//! verify that concurrent readers always observe a consistent value and that
//! writers interleaved with readers neither deadlock nor lose updates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use strata::{ConfigEvent, Instance};

/// Many readers resolving the same keys see the values written before they
/// started.
#[test]
fn test_concurrent_readers() {
    let config = Arc::new(Instance::new());
    config.set_default("mysql.port", 3306).unwrap();
    config.set_config_type("yaml");
    config.read_config(b"mysql:\n  addr: 127.0.0.1\n").unwrap();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let config = Arc::clone(&config);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    assert_eq!(config.get_string("mysql.addr"), "127.0.0.1");
                    assert_eq!(config.get_int("MYSQL.PORT"), 3306);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Writers on distinct keys all land, with readers running alongside.
#[test]
fn test_concurrent_writers_and_readers() {
    let config = Arc::new(Instance::new());
    let writers = 4;
    let per_writer = 100;

    let mut handles = Vec::new();
    for w in 0..writers {
        let config = Arc::clone(&config);
        handles.push(thread::spawn(move || {
            for i in 0..per_writer {
                config.set(&format!("writer{w}.key{i}"), i as i64).unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let config = Arc::clone(&config);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                // Snapshots must always be internally consistent
                let settings = config.all_settings();
                assert!(settings.len() <= writers);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(config.all_keys().len(), writers * per_writer);
    assert_eq!(config.get_int("writer3.key99"), 99);
}

/// Observers are called once per change, even when changes come from several
/// threads, and may read the instance without deadlocking.
#[test]
fn test_observers_under_concurrency() {
    let config = Arc::new(Instance::new());
    let count = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&count);
    let reader = Arc::downgrade(&config);
    config.subscribe(move |event: &ConfigEvent| {
        if let ConfigEvent::Set { key, .. } = event {
            if let Some(config) = reader.upgrade() {
                assert!(config.get(key.raw()).is_some());
            }
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let config = Arc::clone(&config);
            thread::spawn(move || {
                for i in 0..50 {
                    config.set(&format!("t{t}.k{i}"), "v").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(count.load(Ordering::SeqCst), 200);
}

/// Separate instances used from separate threads never see each other.
#[test]
fn test_instances_isolated_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|t| {
            thread::spawn(move || {
                let config = Instance::new();
                config.set_default("ContentDir", format!("content{t}")).unwrap();
                for _ in 0..100 {
                    assert_eq!(config.get_string("contentdir"), format!("content{t}"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

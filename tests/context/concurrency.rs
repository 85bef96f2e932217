//! Concurrency Tests
//!
//! A shared context under parallel writers and readers.

use crate::common::*;
use recordfake::{ColumnSet, Context, Error, Record, Uuid};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_parallel_creates_all_land() {
    let ctx = Arc::new(bare_context());
    let threads = 8;
    let per_thread = 50;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    ctx.create(Record::new("account").set("name", format!("{}-{}", t, i)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ctx.store().count("account"), threads * per_thread);
}

/// Racing creates of one id: exactly one succeeds
#[test]
fn test_racing_creates_of_one_id() {
    let ctx = Arc::new(bare_context());
    let id = Uuid::new_v4();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ctx.create(Record::with_id("account", id)).is_ok()
            })
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
}

/// Versioned updates from many threads: every success gets a distinct version
#[test]
fn test_optimistic_updates_serialize() {
    let ctx: Arc<Context> = Arc::new(bare_context());
    let id = ctx.create(Record::new("counter").set("n", 0i64)).unwrap();
    let threads = 4;
    let rounds = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut applied = 0;
                while applied < rounds {
                    let current = ctx.retrieve("counter", id, &ColumnSet::AllColumns).unwrap();
                    let n = current.get("n").and_then(|v| v.as_int()).unwrap();
                    let next = Record::with_id("counter", id).set("n", n + 1);
                    match ctx.update_if_version(&next, current.row_version) {
                        Ok(_) => applied += 1,
                        Err(Error::ConcurrencyConflict { .. }) => continue,
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = ctx.retrieve("counter", id, &ColumnSet::AllColumns).unwrap();
    assert_eq!(
        stored.get("n").and_then(|v| v.as_int()),
        Some((threads * rounds) as i64)
    );
}

#[test]
fn test_queries_run_alongside_writers() {
    let ctx = Arc::new(bare_context());
    for i in 0..20 {
        account(&ctx, &format!("seed-{}", i));
    }
    let writer = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for i in 0..200 {
                account(&ctx, &format!("late-{}", i));
            }
        })
    };
    for _ in 0..20 {
        let page = ctx
            .fetch(r#"<fetch><entity name="account"><attribute name="name" /></entity></fetch>"#)
            .unwrap();
        assert!(page.records.len() >= 20);
    }
    writer.join().unwrap();
    assert_eq!(ctx.store().count("account"), 220);
}

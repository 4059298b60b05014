//! Performance benchmarks for ordered tree operations
//!
//! Run with: `cargo bench -p ordertree-core`
//!
//! These benchmarks measure the write paths that renumber siblings:
//! - Append create (max sort order + insert in one transaction)
//! - Move to the front of a large sibling group (shifts every sibling)
//! - Concurrency-checked update

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ordertree_core::{LibsqlTreeStore, Node, StoreConfig, TreeStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Setup a store with a fresh database
async fn setup_test_store() -> (Arc<LibsqlTreeStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("bench.db");

    let store = LibsqlTreeStore::open(db_path, StoreConfig::default())
        .await
        .unwrap();
    (Arc::new(store), temp_dir)
}

/// Parent with `count` children appended in order
async fn seed_children(store: &LibsqlTreeStore, count: usize) -> (i64, Vec<i64>) {
    let parent = store.create_node(&Node::new("Parent", None)).await.unwrap();
    let mut children = Vec::with_capacity(count);
    for i in 0..count {
        let id = store
            .create_node(&Node::new(format!("Child{}", i), Some(parent)))
            .await
            .unwrap();
        children.push(id);
    }
    (parent, children)
}

fn bench_create(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("create_appended_child", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_test_store().await;
                let parent = store.create_node(&Node::new("Parent", None)).await.unwrap();

                let start = Instant::now();
                for i in 0..iters {
                    let id = store
                        .create_node(&Node::new(format!("Child{}", i), Some(parent)))
                        .await
                        .unwrap();
                    black_box(id);
                }
                start.elapsed()
            })
        });
    });
}

fn bench_move(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("move");
    group.sample_size(20);

    group.bench_function("last_to_front_of_200", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_test_store().await;
                let (parent, children) = seed_children(&store, 200).await;

                let mut total = Duration::ZERO;
                for i in 0..iters {
                    // Cycle through the group so every move shifts the others
                    let id = children[children.len() - 1 - (i as usize % children.len())];
                    let start = Instant::now();
                    let outcome = store.move_node(id, Some(parent), Some(0)).await.unwrap();
                    total += start.elapsed();
                    black_box(outcome);
                }
                total
            })
        });
    });

    group.bench_function("reparent_append", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_test_store().await;
                let (source, children) = seed_children(&store, 200).await;
                let target = store.create_node(&Node::new("Target", None)).await.unwrap();

                let mut total = Duration::ZERO;
                for i in 0..iters {
                    let id = children[i as usize % children.len()];
                    let parent = if i as usize / children.len() % 2 == 0 {
                        target
                    } else {
                        source
                    };
                    let start = Instant::now();
                    let outcome = store.move_node(id, Some(parent), None).await.unwrap();
                    total += start.elapsed();
                    black_box(outcome);
                }
                total
            })
        });
    });

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("update_with_precondition", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_test_store().await;
                let id = store.create_node(&Node::new("Task", None)).await.unwrap();
                let mut current = store.get_node(id).await.unwrap().unwrap();

                let start = Instant::now();
                for i in 0..iters {
                    let next = current.clone().with_importance(i as i64 + 1);
                    let outcome = store.update_node(&current, &next).await.unwrap();
                    assert!(outcome.is_applied());
                    current = next;
                }
                start.elapsed()
            })
        });
    });
}

criterion_group!(benches, bench_create, bench_move, bench_update);
criterion_main!(benches);

//! Integration Tests for the task engine
//!
//! Exercises the cache, worker and aggregator together through the public API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pfinance::worker::ResultCache;
use pfinance::{
    spawn_sweep_task, BackgroundWorker, EngineError, FanOut, Job, JobError, Middleware, Task,
    TtlCache,
};
use tokio_test::{assert_err, assert_ok};

fn worker(capacity: usize) -> Arc<BackgroundWorker<u32>> {
    Arc::new(BackgroundWorker::new(
        ResultCache::new(),
        capacity,
        Duration::from_secs(60),
    ))
}

fn returning(value: u32) -> Job<u32> {
    Job::new(move |_ctx| async move { Ok(value) })
}

// == Cache ==

#[tokio::test(start_paused = true)]
async fn test_cache_entry_expires_after_ttl() {
    let cache: TtlCache<String, u32> = TtlCache::new();

    assert_eq!(cache.get("never-set").await, None);

    cache.set("k".to_string(), 7, Duration::from_secs(10)).await;
    assert_eq!(cache.get("k").await, Some(7));

    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(cache.get("k").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_removes_unread_entries_within_one_interval() {
    let cache: TtlCache<String, u32> = TtlCache::new();
    cache.set("write-once".to_string(), 1, Duration::from_millis(50)).await;
    cache.set("long-lived".to_string(), 2, Duration::from_secs(3600)).await;

    let handle = spawn_sweep_task(cache.clone(), Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.stats().await.swept, 1);
    handle.abort();
}

// == Worker ==

#[tokio::test]
async fn test_drained_worker_publishes_every_outcome() {
    let worker = worker(8);
    let handle = worker.spawn("drain");

    for n in 0..5u32 {
        let job = if n == 3 {
            Job::new(|_ctx| async { Err(JobError::failed("boom")) })
        } else {
            returning(n)
        };
        assert_ok!(worker.enqueue(Task::new(format!("task-{}", n), job)).await);
    }

    assert_ok!(worker.shutdown(Duration::from_secs(5)).await);
    assert_eq!(worker.len(), 0);

    for n in 0..5u32 {
        let result = worker.get_result(&format!("task-{}", n)).await.unwrap();
        if n == 3 {
            assert_eq!(result.error(), Some(&JobError::failed("boom")));
        } else {
            assert_eq!(result.value(), Some(&n));
        }
    }
    handle.abort();
}

#[tokio::test]
async fn test_shutdown_times_out_on_slow_job() {
    let worker = worker(8);
    let handle = worker.spawn("slow");

    let slow = Job::new(|_ctx| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(1)
    });
    assert_ok!(worker.enqueue(Task::new("slow", slow)).await);

    let result = worker.shutdown(Duration::from_millis(50)).await;
    assert!(matches!(
        assert_err!(result),
        EngineError::ShutdownTimeout { pending: 1 }
    ));
    assert!(worker.len() > 0);
    handle.abort();
}

#[tokio::test]
async fn test_second_middleware_replaces_first() {
    let worker = worker(8);
    let seen = Arc::new(AtomicUsize::new(0));

    let tagging = |tag: usize, seen: Arc<AtomicUsize>| {
        Middleware::new(move |job: Job<u32>| {
            let seen = Arc::clone(&seen);
            Job::new(move |ctx| {
                seen.fetch_add(tag, Ordering::SeqCst);
                job.call(ctx)
            })
        })
    };

    worker.use_middleware(tagging(1, Arc::clone(&seen))).await;
    worker.use_middleware(tagging(10, Arc::clone(&seen))).await;

    let handle = worker.spawn("mw");
    assert_ok!(worker.enqueue(Task::new("job", returning(5))).await);
    assert_ok!(worker.shutdown(Duration::from_secs(5)).await);

    assert_eq!(seen.load(Ordering::SeqCst), 10);
    assert_eq!(worker.get_result("job").await.unwrap().value(), Some(&5));
    handle.abort();
}

// == Aggregator ==

#[tokio::test]
async fn test_failed_branch_keeps_sibling_data() {
    let aggregate = FanOut::<&str, u32>::new()
        .branch("a", async { Ok::<_, String>(HashMap::from([("x", 1)])) })
        .branch("b", async { Err::<HashMap<&str, u32>, _>("source down".to_string()) })
        .branch("c", async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, String>(HashMap::from([("x", 3), ("y", 4)]))
        })
        .run()
        .await;

    assert!(!aggregate.is_complete());
    assert_eq!(aggregate.errors.len(), 1);
    assert_eq!(aggregate.errors[0].branch, "b");
    assert_eq!(aggregate.branch("a"), Some(&HashMap::from([("x", 1)])));
    assert_eq!(aggregate.branch("c").map(HashMap::len), Some(2));
    assert!(aggregate.branch("b").is_none());
}

//! Integration tests for worker pool blocking behaviour.

use std::time::Duration;

use hostdeck_pool::{PoolError, WorkerPool};

#[tokio::test]
async fn test_acquire_all_then_block() {
    let pool = WorkerPool::new("mylabel", 3);

    let mut held = Vec::new();
    for i in 1..=3 {
        let worker = pool
            .acquire_timeout(Duration::from_millis(50))
            .await
            .expect("worker should be free");
        assert_eq!(worker.name(), format!("mylabel:{}", i));
        held.push(worker);
    }

    let err = pool
        .acquire_timeout(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::Timeout { ref pool, .. } if pool == "mylabel"));
    assert_eq!(pool.available(), 0, "timeout must not change the pool");
}

#[tokio::test(start_paused = true)]
async fn test_waiter_wakes_on_release() {
    let pool = WorkerPool::new("nix", 1);
    let held = pool.acquire_timeout(Duration::from_secs(1)).await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire_timeout(Duration::from_secs(30)).await })
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!waiter.is_finished());

    held.release();
    let worker = waiter.await.unwrap().expect("released worker is handed on");
    assert_eq!(worker.name(), "nix:1");
}

#[tokio::test(start_paused = true)]
async fn test_deadline_elapses() {
    let pool = WorkerPool::new("nix", 1);
    let _held = pool.try_acquire().unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    let err = pool.acquire_until(deadline).await.unwrap_err();

    match err {
        PoolError::Timeout { waited, .. } => assert!(waited >= Duration::from_secs(30)),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_acquire_or_cancel() {
    let pool = WorkerPool::new("nix", 1);
    let _held = pool.try_acquire().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move {
            pool.acquire_or_cancel(async {
                let _ = rx.await;
            })
            .await
        })
    };

    tx.send(()).unwrap();
    let err = waiter.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        PoolError::Canceled {
            pool: "nix".to_string()
        }
    );
    assert_eq!(pool.available(), 0);
}

#[tokio::test]
async fn test_worker_released_across_tasks() {
    let pool = WorkerPool::new("nix", 2);

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let worker = pool.acquire_timeout(Duration::from_secs(5)).await?;
            assert!(pool.available() < pool.capacity());
            tokio::time::sleep(Duration::from_millis(5)).await;
            drop(worker);
            Ok::<_, PoolError>(())
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(pool.available(), 2);
}

// tests/unit_coalescer_test.rs

use cascade_route::cache::RequestCoalescer;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn single_leader_runs_factory_once() {
    let coalescer = Arc::new(RequestCoalescer::<u32>::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let coalescer = coalescer.clone();
        let calls = calls.clone();
        handles.push(tokio::spawn(async move {
            coalescer
                .try_execute("k", Duration::from_millis(1000), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    42u32
                })
                .await
        }));
    }

    for h in handles {
        let (ok, value) = h.await.unwrap();
        assert!(ok);
        assert_eq!(value, Some(42));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(coalescer.inflight_count(), 0);
}

#[tokio::test]
async fn zero_timeout_follower_fails_fast_leader_continues() {
    let coalescer = Arc::new(RequestCoalescer::<u32>::new());
    let coalescer_leader = coalescer.clone();

    let leader = tokio::spawn(async move {
        coalescer_leader
            .try_execute("k", Duration::from_millis(1000), || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                7u32
            })
            .await
    });

    tokio::time::sleep(Duration::from_millis(5)).await;
    let (ok, value) = coalescer
        .try_execute("k", Duration::from_millis(0), || async move { unreachable!() })
        .await;
    assert!(!ok);
    assert_eq!(value, None);

    let (leader_ok, leader_value) = leader.await.unwrap();
    assert!(leader_ok);
    assert_eq!(leader_value, Some(7));
}

#[tokio::test]
async fn distinct_keys_run_independent_leaders() {
    let coalescer = Arc::new(RequestCoalescer::<u32>::new());
    let (a, b) = tokio::join!(
        coalescer.try_execute("a", Duration::from_millis(1000), || async { 1u32 }),
        coalescer.try_execute("b", Duration::from_millis(1000), || async { 2u32 }),
    );
    assert_eq!(a, (true, Some(1)));
    assert_eq!(b, (true, Some(2)));
}

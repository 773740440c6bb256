use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use kvlock::{
    CancelToken, InMemoryStore, Lock, LockError, LockFailure, LockManager, LockOptions,
    StoreLockManager,
};
use proptest::prelude::*;

use crate::support::{unavailable, Scripted, ScriptedStore};

fn fast(retry_count: u32) -> LockOptions {
    LockOptions::new()
        .with_retry_count(retry_count)
        .with_retry_delay(Duration::from_millis(5))
}

// =============================================================================
// Single attempt
// =============================================================================

#[test]
fn acquire_on_empty_store_takes_one_call() {
    let store = Arc::new(ScriptedStore::new());
    let manager = StoreLockManager::new(Arc::clone(&store));

    let lock = manager.acquire("orders", &LockOptions::default()).unwrap();

    assert_eq!(lock.key(), "orders");
    assert_eq!(store.set_calls(), 1);
    assert!(store.inner().contains("orders"));
}

#[test]
fn no_retry_fails_immediately_on_contention() {
    let store = Arc::new(ScriptedStore::holding("orders"));
    let manager = StoreLockManager::new(Arc::clone(&store));

    let started = Instant::now();
    let err = manager.acquire("orders", &LockOptions::default()).unwrap_err();

    assert_eq!(store.set_calls(), 1);
    assert!(err.is_contended());
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[test]
fn no_retry_fails_immediately_on_store_error() {
    let store = Arc::new(ScriptedStore::new());
    store.push(Scripted::Fail(unavailable()));
    let manager = StoreLockManager::new(Arc::clone(&store));

    let err = manager.acquire("orders", &LockOptions::default()).unwrap_err();

    assert_eq!(store.set_calls(), 1);
    assert!(err.is_store_failure());
    assert_eq!(
        err,
        LockError::Acquire {
            key: "orders".into(),
            attempts: 1,
            cause: LockFailure::Store(unavailable()),
        }
    );
}

#[test]
fn sequential_acquires_without_release_contend() {
    let manager = StoreLockManager::new(Arc::new(InMemoryStore::new()));

    let _first = manager.acquire("orders", &LockOptions::default()).unwrap();
    let second = manager.acquire("orders", &LockOptions::default());

    let err = second.unwrap_err();
    assert!(err.is_contended());
    assert!(err.to_string().contains("key already held"));
}

#[test]
fn distinct_keys_do_not_contend() {
    let manager = StoreLockManager::new(Arc::new(InMemoryStore::new()));
    let _a = manager.acquire("orders", &LockOptions::default()).unwrap();
    let _b = manager.acquire("invoices", &LockOptions::default()).unwrap();
}

// =============================================================================
// Retries
// =============================================================================

#[test]
fn persistent_contention_makes_retry_count_plus_one_calls() {
    let store = Arc::new(ScriptedStore::holding("orders"));
    let manager = StoreLockManager::new(Arc::clone(&store));
    let delay = Duration::from_millis(20);
    let options = LockOptions::new().with_retry_count(3).with_retry_delay(delay);

    let err = manager.acquire("orders", &options).unwrap_err();

    assert_eq!(store.set_calls(), 4);
    assert!(matches!(
        err,
        LockError::Acquire {
            attempts: 4,
            cause: LockFailure::Held,
            ..
        }
    ));
    for gap in store.gaps() {
        assert!(gap >= delay, "attempts spaced {:?}, expected >= {:?}", gap, delay);
    }
}

#[test]
fn store_errors_consume_attempts() {
    let store = Arc::new(ScriptedStore::new());
    store
        .push(Scripted::Fail(unavailable()))
        .push(Scripted::Fail(unavailable()))
        .push(Scripted::Fail(unavailable()));
    let manager = StoreLockManager::new(Arc::clone(&store));

    let err = manager.acquire("orders", &fast(2)).unwrap_err();

    assert_eq!(store.set_calls(), 3);
    assert!(err.is_store_failure());
    assert!(!store.inner().contains("orders"));
}

#[test]
fn store_error_then_success_yields_lock() {
    let store = Arc::new(ScriptedStore::new());
    store.push(Scripted::Fail(unavailable()));
    let manager = StoreLockManager::new(Arc::clone(&store));

    let lock = manager.acquire("orders", &fast(1)).unwrap();

    assert_eq!(lock.key(), "orders");
    assert_eq!(store.set_calls(), 2);
}

#[test]
fn last_failure_decides_the_cause() {
    let store = Arc::new(ScriptedStore::new());
    store
        .push(Scripted::Fail(unavailable()))
        .push(Scripted::Held);
    let manager = StoreLockManager::new(Arc::clone(&store));

    let err = manager.acquire("orders", &fast(1)).unwrap_err();
    assert!(err.is_contended());
}

#[test]
fn zero_retry_delay_falls_back_to_default() {
    let store = Arc::new(ScriptedStore::holding("orders"));
    let manager = StoreLockManager::new(Arc::clone(&store));
    let options = LockOptions::new().with_retry_count(1);

    let started = Instant::now();
    manager.acquire("orders", &options).unwrap_err();

    assert_eq!(store.set_calls(), 2);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[test]
fn retry_succeeds_once_holder_releases() {
    let store = Arc::new(InMemoryStore::new());
    let manager = StoreLockManager::new(Arc::clone(&store));
    let mut holder = manager.acquire("orders", &LockOptions::default()).unwrap();

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        holder.release().unwrap();
    });

    let options = LockOptions::new()
        .with_retry_count(200)
        .with_retry_delay(Duration::from_millis(5));
    let lock = manager.acquire("orders", &options).unwrap();

    releaser.join().unwrap();
    assert_eq!(lock.key(), "orders");
}

#[test]
fn expired_key_can_be_acquired_again() {
    let store = Arc::new(InMemoryStore::new());
    let manager = StoreLockManager::new(Arc::clone(&store));
    let options = LockOptions::new().with_key_expiration(Duration::from_millis(30));

    let _abandoned = manager.acquire("orders", &options).unwrap();
    thread::sleep(Duration::from_millis(60));

    manager.acquire("orders", &options).unwrap();
}

#[test]
fn release_then_acquire_again_succeeds() {
    let store = Arc::new(ScriptedStore::new());
    let manager = StoreLockManager::new(Arc::clone(&store));
    let options = LockOptions::new().with_key_expiration(Duration::from_secs(10));

    let mut lock = manager.acquire("orders", &options).unwrap();
    lock.release().unwrap();
    assert_eq!(store.delete_results(), vec![1]);

    manager.acquire("orders", &options).unwrap();
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn racing_threads_have_a_single_winner() {
    let store = Arc::new(InMemoryStore::new());
    let manager = Arc::new(StoreLockManager::new(store));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.acquire("orders", &LockOptions::default()).is_ok()
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

#[test]
fn managers_sharing_a_store_exclude_each_other() {
    let store = InMemoryStore::new();
    let process_a = StoreLockManager::new(Arc::new(store.clone()));
    let process_b = StoreLockManager::new(Arc::new(store));

    let mut lock = process_a.acquire("orders", &LockOptions::default()).unwrap();
    assert!(process_b
        .acquire("orders", &LockOptions::default())
        .unwrap_err()
        .is_contended());

    lock.release().unwrap();
    process_b.acquire("orders", &LockOptions::default()).unwrap();
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn cancel_during_wait_returns_early() {
    let store = Arc::new(ScriptedStore::holding("orders"));
    let manager = StoreLockManager::new(Arc::clone(&store));
    let options = LockOptions::new()
        .with_retry_count(1_000)
        .with_retry_delay(Duration::from_secs(10));

    let token = CancelToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        canceller.cancel();
    });

    let started = Instant::now();
    let err = manager
        .acquire_cancellable("orders", &options, &token)
        .unwrap_err();
    handle.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        err,
        LockError::Cancelled {
            key: "orders".into(),
            attempts: 1,
        }
    );
    assert_eq!(store.set_calls(), 1);
}

#[test]
fn cancellable_acquire_still_honors_attempt_budget() {
    let store = Arc::new(ScriptedStore::holding("orders"));
    let manager = StoreLockManager::new(Arc::clone(&store));

    let err = manager
        .acquire_cancellable("orders", &fast(2), &CancelToken::new())
        .unwrap_err();

    assert_eq!(store.set_calls(), 3);
    assert!(err.is_contended());
}

#[test]
fn unbounded_retry_delay_waits_until_cancelled() {
    let store = Arc::new(ScriptedStore::holding("orders"));
    let manager = StoreLockManager::new(Arc::clone(&store));
    let options = LockOptions::new()
        .with_retry_count(1)
        .with_retry_delay(Duration::MAX);

    let token = CancelToken::new();
    let canceller = token.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        canceller.cancel();
    });

    let err = manager
        .acquire_cancellable("orders", &options, &token)
        .unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, LockError::Cancelled { attempts: 1, .. }));
    assert_eq!(store.set_calls(), 1);
}

// =============================================================================
// Extreme durations
// =============================================================================

#[test]
fn unbounded_key_expiration_acquires_without_expiry() {
    let store = Arc::new(InMemoryStore::new());
    let manager = StoreLockManager::new(Arc::clone(&store));
    let options = LockOptions::new().with_key_expiration(Duration::MAX);

    let mut lock = manager.acquire("orders", &options).unwrap();

    assert_eq!(store.ttl("orders"), Some(None));
    lock.release().unwrap();
    assert!(!store.contains("orders"));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn contended_acquire_makes_exactly_n_plus_one_calls(retry_count in 0u32..5) {
        let store = Arc::new(ScriptedStore::holding("orders"));
        let manager = StoreLockManager::new(Arc::clone(&store));
        let options = LockOptions::new()
            .with_retry_count(retry_count)
            .with_retry_delay(Duration::from_millis(1));

        let err = manager.acquire("orders", &options).unwrap_err();

        prop_assert_eq!(store.set_calls(), retry_count as usize + 1);
        prop_assert!(err.is_contended());
    }
}

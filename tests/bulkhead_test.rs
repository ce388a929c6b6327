//! Tests for bulkhead admission control.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use heimdall::notify::Notifier;
use heimdall::{Bulkhead, HeimdallError, OverloadPolicy, Result};

/// Notifier that records every warning it is asked to show.
#[derive(Debug, Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

#[tokio::test]
async fn calls_within_capacity_all_admit() {
    let gate = Arc::new(Bulkhead::with_capacity(4, heimdall::notify::null_notifier()));
    let (release_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let mut handles = Vec::new();
    for i in 0..4 {
        let gate = Arc::clone(&gate);
        let mut release = release_tx.subscribe();
        handles.push(tokio::spawn(async move {
            gate.execute(&format!("GET /call/{i}"), OverloadPolicy::Refuse, || async move {
                release.recv().await.ok();
                Ok(i)
            })
            .await
        }));
    }

    // Let all four tasks take their slots and park.
    tokio::task::yield_now().await;
    assert_eq!(gate.available_slots(), 0);

    release_tx.send(()).unwrap();
    for result in futures_util::future::join_all(handles).await {
        assert!(result.unwrap().is_ok(), "no call within capacity may be refused");
    }
    assert_eq!(gate.available_slots(), 4);
}

#[tokio::test]
async fn slot_counter_restores_with_injected_failures() {
    let gate = Bulkhead::with_capacity(3, heimdall::notify::null_notifier());

    for i in 0..10 {
        let result: Result<u32> = gate
            .execute("GET /flaky", OverloadPolicy::Proceed, || async move {
                if i % 2 == 0 {
                    Err(HeimdallError::Http("injected".into()))
                } else {
                    Ok(i)
                }
            })
            .await;
        assert_eq!(result.is_err(), i % 2 == 0);
    }

    assert_eq!(gate.available_slots(), 3);
}

#[tokio::test]
async fn capacity_plus_one_observes_overload() {
    let capacity = 3;
    let gate = Arc::new(Bulkhead::with_capacity(capacity, heimdall::notify::null_notifier()));
    let (release_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let mut holders = Vec::new();
    for _ in 0..capacity {
        let gate = Arc::clone(&gate);
        let mut release = release_tx.subscribe();
        holders.push(tokio::spawn(async move {
            gate.execute("GET /holder", OverloadPolicy::Refuse, || async move {
                release.recv().await.ok();
                Ok(())
            })
            .await
        }));
    }
    tokio::task::yield_now().await;
    assert_eq!(gate.available_slots(), 0);

    // The N+1th call sees the gate at capacity.
    let refused: Result<()> = gate
        .execute("GET /extra", OverloadPolicy::Refuse, || async { Ok(()) })
        .await;
    assert!(matches!(refused, Err(HeimdallError::ExceededRateLimit)));

    release_tx.send(()).unwrap();
    for holder in holders {
        holder.await.unwrap().unwrap();
    }
    assert_eq!(gate.available_slots(), capacity);
}

#[tokio::test]
async fn proceed_policy_still_runs_task_at_overload() {
    let gate = Bulkhead::with_capacity(0, heimdall::notify::null_notifier());
    let ran = AtomicU32::new(0);

    let result: Result<u32> = gate
        .execute("GET /anyway", OverloadPolicy::Proceed, || async {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refusal_warns_user_exactly_once() {
    let notifier = Arc::new(RecordingNotifier::default());
    let gate = Bulkhead::with_capacity(0, notifier.clone());

    for _ in 0..5 {
        let refused: Result<()> = gate
            .execute("GET /refused", OverloadPolicy::Refuse, || async { Ok(()) })
            .await;
        assert!(refused.is_err());
    }

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1, "overload warning must be one-shot");
    assert!(messages[0].contains("excessive"));
}

#[tokio::test]
async fn refused_task_is_never_started() {
    let gate = Bulkhead::with_capacity(0, heimdall::notify::null_notifier());
    let started = AtomicU32::new(0);

    let refused: Result<()> = gate
        .execute("GET /never", OverloadPolicy::Refuse, || {
            started.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert!(matches!(refused, Err(HeimdallError::ExceededRateLimit)));
    assert_eq!(started.load(Ordering::SeqCst), 0);
}

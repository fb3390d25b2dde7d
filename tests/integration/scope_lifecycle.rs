//! Integration tests for activation, deactivation and identity handling

use proptest::prelude::*;
use ui_poll::host::{JournalEntry, SimulatedHost};
use ui_poll::poll::{Interceptor, Replay, ReplayPolicy};
use ui_poll::{Host, PollError, PollScope};

use super::common::fixtures::{cell_identity, count, host_running_cell, position, request};

/// Activate, defer three requests, deactivate, replay: original order, handler
/// restored before the first replayed request runs.
#[tokio::test]
async fn test_deferred_requests_replay_in_arrival_order() {
    let host = host_running_cell();
    let interceptor = Interceptor::activate(host.clone()).expect("activation should succeed");

    for id in ["r1", "r2", "r3"] {
        host.push_request(request(id));
    }
    host.run_until_idle().await.unwrap();
    assert!(host.executed().is_empty(), "nothing runs while intercepted");

    let deferred = interceptor.deactivate();
    assert_eq!(deferred.len(), 3);

    let replay = Replay::new(
        host.clone(),
        interceptor.original_handler().clone(),
        ReplayPolicy::SkipAborted,
    );
    let report = replay.run(deferred).await.unwrap();
    assert_eq!(report.dispatched, 3);
    assert_eq!(host.executed(), vec!["r1", "r2", "r3"]);

    let restored = position(&host, |e| *e == JournalEntry::HandlerRestored).unwrap();
    let first = position(&host, |e| matches!(e, JournalEntry::Executed { .. })).unwrap();
    assert!(restored < first);
}

#[tokio::test]
async fn test_second_activation_is_rejected() {
    let host = SimulatedHost::new();
    let scope = PollScope::acquire(host.clone()).unwrap();

    match PollScope::acquire(host.clone()) {
        Err(PollError::AlreadyActive(id)) => assert_eq!(id, host.id()),
        other => panic!("Expected AlreadyActive, got {:?}", other),
    }

    // Other hosts in the same process are unaffected.
    let other = SimulatedHost::new();
    PollScope::acquire(other).unwrap().release();

    scope.release();
    PollScope::acquire(host).unwrap().release();
}

#[tokio::test]
async fn test_deactivate_twice_returns_queue_once() {
    let host = SimulatedHost::new();
    let interceptor = Interceptor::activate(host.clone()).unwrap();
    host.push_request(request("r1"));
    host.run_until_idle().await.unwrap();

    assert_eq!(interceptor.deactivate().len(), 1);
    assert!(interceptor.deactivate().is_empty());
    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 1);
}

#[tokio::test]
async fn test_host_completion_finishes_forgotten_scope() {
    let host = host_running_cell();
    let scope = PollScope::acquire(host.clone()).unwrap();
    host.push_request(request("r1"));
    scope.poll(1).await.unwrap();

    // The foreground task ends without the scope being released.
    host.complete_task();
    assert!(!scope.is_active());
    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 1);

    // r1 has not replayed yet, so the host is still taken.
    assert!(matches!(
        PollScope::acquire(host.clone()),
        Err(PollError::AlreadyActive(_))
    ));

    drop(scope);
    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 1);

    host.run_until_idle().await.unwrap();
    assert_eq!(host.executed(), vec!["r1"]);
    PollScope::acquire(host).unwrap().release();
}

/// A scope acquired right after another one must not become the loop that
/// runs the earlier scope's deferred requests.
#[tokio::test]
async fn test_deferred_requests_never_run_under_a_later_scope() {
    let host = host_running_cell();
    let first = PollScope::acquire(host.clone()).unwrap();
    host.push_request(request("r1"));
    first.poll(1).await.unwrap();
    first.release();

    let second = PollScope::acquire(host.clone());
    assert!(matches!(second, Err(PollError::AlreadyActive(_))));

    // The replay task is the only pending event; running it frees the host.
    assert_eq!(host.pending_events(), 1);
    host.run_one_loop_iteration().await.unwrap();
    assert_eq!(host.executed(), vec!["r1"]);

    let second = PollScope::acquire(host.clone()).unwrap();
    host.push_request(request("r2"));
    second.poll(1).await.unwrap();
    assert_eq!(host.executed(), vec!["r1"]);
    assert_eq!(second.deferred(), 1);
    second.release();
}

#[tokio::test]
async fn test_suspending_original_handler_is_awaited_on_replay() {
    let host = SimulatedHost::with_suspending_handler();
    host.set_current_task_identity(cell_identity());
    let scope = PollScope::acquire(host.clone()).unwrap();

    host.push_request(request("r1"));
    host.push_request(request("r2"));
    scope.poll(2).await.unwrap();
    scope.release();

    assert!(host.handler_is_suspending());
    host.run_until_idle().await.unwrap();
    assert_eq!(
        host.journal()
            .into_iter()
            .filter(|e| matches!(e, JournalEntry::Executed { .. }))
            .collect::<Vec<_>>(),
        vec![
            JournalEntry::Executed {
                message_id: "r1".into(),
                identity: "client-r1".into()
            },
            JournalEntry::Executed {
                message_id: "r2".into(),
                identity: "client-r2".into()
            },
        ]
    );
}

#[derive(Debug, Clone)]
enum Step {
    Request,
    Callback,
    Pump(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Request),
        Just(Step::Callback),
        (0usize..4).prop_map(Step::Pump),
    ]
}

proptest! {
    /// Whatever arrives and however the pump is driven, identity is back to the
    /// activation value after every pump and requests replay in arrival order.
    #[test]
    fn prop_identity_and_order_hold(steps in prop::collection::vec(step(), 1..40)) {
        let host = host_running_cell();
        let scope = PollScope::acquire(host.clone()).unwrap();
        let mut sent = Vec::new();

        for (i, step) in steps.iter().enumerate() {
            match step {
                Step::Request => {
                    let id = format!("r{i}");
                    host.push_request(request(&id));
                    sent.push(id);
                }
                Step::Callback => host.push_callback(format!("cb{i}"), |_| {}),
                Step::Pump(n) => {
                    tokio_test::block_on(scope.poll(*n)).unwrap();
                    prop_assert_eq!(host.current_task_identity(), cell_identity());
                }
            }
        }

        // Drain whatever is still queued while interception is active.
        let pending = host.pending_events();
        tokio_test::block_on(scope.poll(pending)).unwrap();
        prop_assert_eq!(host.current_task_identity(), cell_identity());
        prop_assert_eq!(scope.deferred(), sent.len());

        scope.release();
        tokio_test::block_on(host.run_until_idle()).unwrap();
        prop_assert_eq!(host.executed(), sent);
    }
}

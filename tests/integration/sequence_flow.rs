//! Integration tests for the sequence combinators

use futures::stream::{self, StreamExt};
use ui_poll::host::{JournalEntry, SimulatedHost};
use ui_poll::{with_polling, with_polling_blocking, Host};

use super::common::fixtures::{cell_identity, count, host_running_cell, request};

#[tokio::test]
async fn test_abandoned_stream_replays_exactly_once() {
    let host = host_running_cell();
    let mut wrapped = Box::pin(with_polling(host.clone(), stream::iter(0..10), 1).unwrap());

    host.push_request(request("r1"));
    host.push_request(request("r2"));

    let mut consumed = Vec::new();
    while let Some(item) = wrapped.next().await {
        consumed.push(item.unwrap());
        if consumed.len() == 3 {
            break;
        }
    }
    assert_eq!(consumed, vec![0, 1, 2]);
    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 0);

    drop(wrapped);
    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 1);

    host.run_until_idle().await.unwrap();
    assert_eq!(host.executed(), vec!["r1", "r2"]);

    // Nothing is left to replay a second time.
    host.clear_journal();
    host.run_until_idle().await.unwrap();
    assert!(host.journal().is_empty());
}

#[tokio::test]
async fn test_stream_keeps_identity_between_elements() {
    let host = host_running_cell();
    let observer = host.clone();
    host.push_request(request("r1"));

    let identities: Vec<_> = with_polling(host.clone(), stream::iter(0..3), 2)
        .unwrap()
        .map(|item| {
            item.unwrap();
            observer.current_task_identity()
        })
        .collect()
        .await;

    assert_eq!(identities, vec![cell_identity(); 3]);
}

#[test]
fn test_blocking_iterator_early_exit_replays_once() {
    let host = SimulatedHost::new();
    host.push_request(request("r1"));

    let mut iter = with_polling_blocking(host.clone(), 0..1_000, 1).unwrap();
    assert_eq!(iter.next().unwrap().unwrap(), 0);
    assert_eq!(iter.next().unwrap().unwrap(), 1);
    drop(iter);

    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 1);
    tokio_test::block_on(host.run_until_idle()).unwrap();
    assert_eq!(host.executed(), vec!["r1"]);
}

#[test]
fn test_blocking_iterator_exhaustion_ends_scope_before_drop() {
    let host = SimulatedHost::new();
    let mut iter = with_polling_blocking(host.clone(), ["a", "b"], 1).unwrap();

    assert_eq!(iter.next().unwrap().unwrap(), "a");
    assert_eq!(iter.next().unwrap().unwrap(), "b");
    assert!(iter.next().is_none());
    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 1);

    // Pulling past the end stays finished.
    assert!(iter.next().is_none());
    drop(iter);
    assert_eq!(count(&host, &JournalEntry::HandlerRestored), 1);
}

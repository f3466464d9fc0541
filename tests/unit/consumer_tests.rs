//! Unit tests for the sink consumer task.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use lsp_recorder::models::{LogData, PayloadType, StreamType};
use lsp_recorder::sink::run_sink;

use super::test_helpers::MemorySink;

/// Records are written in the order they were enqueued.
#[tokio::test]
async fn writes_records_in_dequeue_order() {
    let (tx, rx) = mpsc::channel(4);
    let sink = MemorySink::default();
    let task = tokio::spawn(run_sink(rx, sink.clone(), CancellationToken::new()));

    for i in 0..10 {
        tx.send(LogData::raw(StreamType::Stderr, format!("line {i}")))
            .await
            .expect("send");
    }
    drop(tx);

    task.await.expect("join").expect("sink finishes");
    let msgs: Vec<_> = sink.records().into_iter().map(|r| r.msg).collect();
    let expected: Vec<_> = (0..10).map(|i| format!("line {i}")).collect();
    assert_eq!(msgs, expected);
    assert!(sink.is_finished());
}

/// Cancellation still drains every record already in the mailbox.
#[tokio::test]
async fn cancellation_drains_pending_records() {
    let (tx, rx) = mpsc::channel(16);
    for i in 0..5 {
        tx.send(LogData::new(StreamType::Stdout, PayloadType::Json, format!("{{\"id\":{i}}}")))
            .await
            .expect("send");
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = MemorySink::default();
    run_sink(rx, sink.clone(), cancel).await.expect("sink finishes");

    assert_eq!(sink.records().len(), 5);
    assert!(sink.is_finished());
    assert!(tx.is_closed(), "mailbox is closed once the consumer stops");
}

/// After cancellation producers see a closed mailbox instead of blocking.
#[tokio::test]
async fn producers_fail_fast_after_cancellation() {
    let (tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_sink(rx, MemorySink::default(), cancel.clone()));

    cancel.cancel();
    task.await.expect("join").expect("sink finishes");
    assert!(tx.send(LogData::raw(StreamType::Stderr, "late")).await.is_err());
}

/// A failing sink skips records but the consumer keeps running.
#[tokio::test]
async fn write_errors_do_not_stop_the_consumer() {
    let (tx, rx) = mpsc::channel(4);
    let sink = MemorySink {
        fail_writes: true,
        ..MemorySink::default()
    };
    tx.send(LogData::raw(StreamType::Stderr, "a")).await.expect("send");
    tx.send(LogData::raw(StreamType::Stderr, "b")).await.expect("send");
    drop(tx);

    run_sink(rx, sink.clone(), CancellationToken::new())
        .await
        .expect("finish succeeds");
    assert!(sink.records().is_empty());
    assert!(sink.is_finished());
}

//! Framing failures and traffic on one stream never affect the others.

#![cfg(unix)]

use tokio::io::AsyncWriteExt;

use lsp_recorder::models::{PayloadType, StreamType};

use super::test_helpers::{frame, record_session, shell};

/// Garbage on stdout yields an invalid record; the message after it and
/// stderr are recorded normally.
#[tokio::test]
async fn garbage_on_stdout_is_isolated() {
    let script = concat!(
        r"printf 'garbage\n'; ",
        r"printf 'Content-Length: 2\r\n\r\n{}'; ",
        r"printf 'still here\n' >&2",
    );
    let recorded = record_session(shell(script), tokio::io::empty(), std::future::pending()).await;

    let mut expected = b"garbage\n".to_vec();
    expected.extend_from_slice(&frame("{}"));
    assert_eq!(recorded.stdout, expected, "garbage is forwarded too");

    let invalid = recorded.of(StreamType::Stdout, PayloadType::Invalid);
    assert_eq!(invalid.len(), 1, "one record for the whole garbage run");
    assert!(invalid[0].msg.starts_with("invalid message header"), "{}", invalid[0].msg);

    let json = recorded.of(StreamType::Stdout, PayloadType::Json);
    assert_eq!(json.len(), 1);
    assert_eq!(json[0].msg, "{}");

    let stderr: String = recorded
        .traffic()
        .iter()
        .filter(|r| r.stream == StreamType::Stderr)
        .map(|r| r.msg.as_str())
        .collect();
    assert_eq!(stderr, "still here\n");
}

/// Editor traffic on stdin is recorded while the child ignores it.
#[tokio::test]
async fn stdin_traffic_is_recorded_independently() {
    let (mut editor_in, proxy_stdin) = tokio::io::duplex(1024);
    let request = frame(r#"{"jsonrpc":"2.0","method":"initialized"}"#);
    editor_in.write_all(&request).await.expect("write request");

    // The child reads its stdin before exiting so the message is delivered.
    let script = "head -c 1 >/dev/null; sleep 0.2; printf 'Content-Length: 2\\r\\n\\r\\n[]'";
    let recorded = record_session(shell(script), proxy_stdin, std::future::pending()).await;

    let stdin_json = recorded.of(StreamType::Stdin, PayloadType::Json);
    assert_eq!(stdin_json.len(), 1);
    assert_eq!(stdin_json[0].msg, r#"{"jsonrpc":"2.0","method":"initialized"}"#);

    let stdout_json = recorded.of(StreamType::Stdout, PayloadType::Json);
    assert_eq!(stdout_json.len(), 1);
    assert_eq!(stdout_json[0].msg, "[]");
    assert!(recorded
        .records
        .iter()
        .all(|r| r.payload != PayloadType::Invalid));
    drop(editor_in);
}

//! Unit tests for the log pretty-printer.

use std::io::Cursor;

use chrono::{TimeZone, Utc};

use lsp_recorder::models::{LogRecord, PayloadType, StreamType};
use lsp_recorder::print::{open_log_reader, parse_record, print_log, render};
use lsp_recorder::sink::text::format_line;
use lsp_recorder::sink::GzipSink;
use lsp_recorder::{AppError, LogSink};

fn record(stream: StreamType, payload: PayloadType, msg: &str) -> LogRecord {
    LogRecord {
        timestamp: Utc
            .with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
            .single()
            .expect("valid date"),
        stream,
        payload,
        msg: msg.into(),
    }
}

const TS: &str = "2024-05-01T10:00:00.000000000Z";

#[test]
fn json_payload_is_reindented() {
    let body = r#"{"id":1,"method":"initialize"}"#;
    let rendered = render(&record(StreamType::Stdin, PayloadType::Json, body));
    assert_eq!(
        rendered,
        format!("{TS} <stdin>\n{{\n  \"id\": 1,\n  \"method\": \"initialize\"\n}}")
    );
}

#[test]
fn json_key_order_is_preserved() {
    let rendered = render(&record(StreamType::Stdout, PayloadType::Json, r#"{"z":1,"a":2}"#));
    let z = rendered.find("\"z\"").expect("z present");
    let a = rendered.find("\"a\"").expect("a present");
    assert!(z < a, "keys keep their original order: {rendered}");
}

#[test]
fn number_literals_are_printed_as_sent() {
    let rendered = render(&record(
        StreamType::Stdout,
        PayloadType::Json,
        r#"{"id":12345678901234567890123,"x":1e5,"y":-0.10}"#,
    ));
    let body = "{\n  \"id\": 12345678901234567890123,\n  \"x\": 1e5,\n  \"y\": -0.10\n}";
    assert_eq!(rendered, format!("{TS} <stdout>\n{body}"));
}

#[test]
fn malformed_json_payload_is_printed_verbatim() {
    let rendered = render(&record(StreamType::Stdout, PayloadType::Json, "{not json"));
    assert_eq!(rendered, format!("{TS} <stdout> invalid json payload\n{{not json"));
}

#[test]
fn non_json_payloads_keep_their_tag() {
    let end = record(StreamType::Stderr, PayloadType::RawEnd, "command exited with: 0");
    let rendered = render(&end);
    assert_eq!(rendered, format!("{TS} <stderr> [end] command exited with: 0"));
}

#[test]
fn parse_record_accepts_both_line_encodings() {
    let original = record(StreamType::Stderr, PayloadType::Raw, "hello");
    let json = serde_json::to_string(&original).expect("serialize");
    let text = format_line(&original).expect("format");
    assert_eq!(parse_record(&json), Ok(original.clone()));
    assert_eq!(parse_record(&text), Ok(original));
}

#[test]
fn print_log_handles_mixed_lines_and_blanks() {
    let json = serde_json::to_string(&record(StreamType::Stdout, PayloadType::Json, "[1]"))
        .expect("serialize");
    let text = format_line(&record(StreamType::Stderr, PayloadType::Raw, "warn")).expect("format");
    let input = format!("{json}\n\n{text}\r\n");

    let mut out = Vec::new();
    print_log(Cursor::new(input), &mut out).expect("print");
    assert_eq!(
        String::from_utf8(out).expect("utf8"),
        format!("{TS} <stdout>\n[\n  1\n]\n{TS} <stderr> [raw] warn\n")
    );
}

#[test]
fn print_log_reports_line_number_of_bad_record() {
    let good = serde_json::to_string(&record(StreamType::Stdout, PayloadType::Json, "1"))
        .expect("serialize");
    let input = format!("{good}\nthis is not a record\n");

    let err = print_log(Cursor::new(input), Vec::new()).expect_err("must fail");
    match err {
        AppError::Print(msg) => assert!(msg.starts_with("line 2:"), "{msg}"),
        other => panic!("expected AppError::Print, got {other:?}"),
    }
}

#[test]
fn gzip_logs_are_detected_by_magic_bytes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("session.log");

    let mut sink = GzipSink::new(std::fs::File::create(&path).expect("create"));
    sink.write_record(&record(StreamType::Stdin, PayloadType::Json, r#"{"a":true}"#))
        .expect("write");
    sink.finish().expect("finish");
    drop(sink);

    let reader = open_log_reader(&path).expect("open");
    let mut out = Vec::new();
    print_log(reader, &mut out).expect("print");
    assert_eq!(
        String::from_utf8(out).expect("utf8"),
        format!("{TS} <stdin>\n{{\n  \"a\": true\n}}\n")
    );
}

#[test]
fn missing_log_is_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = open_log_reader(temp.path().join("absent.log"));
    assert!(matches!(result, Err(AppError::Io(_))));
}

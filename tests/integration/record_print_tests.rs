//! Record a session to disk in every format and pretty-print it back.

#![cfg(unix)]

use lsp_recorder::print::{open_log_reader, print_log};
use lsp_recorder::sink::open_log_file;
use lsp_recorder::{LogFormat, ProxyIo, Recorder, RecorderConfig};

use super::test_helpers::{shell, test_config};

#[tokio::test]
async fn every_format_prints_back() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = RecorderConfig {
        capture_environment: false,
        ..test_config()
    };
    let script = r#"printf 'Content-Length: 8\r\n\r\n{"id":1}'; printf 'ready\n' >&2"#;

    for format in [LogFormat::Text, LogFormat::Json, LogFormat::JsonGzip] {
        let path = temp.path().join(format!("{format:?}.log"));
        let sink = open_log_file(&path, format).expect("open log");
        let io = ProxyIo {
            stdin: tokio::io::empty(),
            stdout: tokio::io::sink(),
            stderr: tokio::io::sink(),
        };
        let report = Recorder::new(config.clone())
            .expect("valid config")
            .run(&shell(script), io, sink, std::future::pending())
            .await;
        assert_eq!(
            report.outcome.expect("session succeeds").exit_code(),
            Some(0)
        );
        drop(report.sink.expect("sink finishes"));

        let mut out = Vec::new();
        print_log(open_log_reader(&path).expect("open for print"), &mut out).expect("print");
        let printed = String::from_utf8(out).expect("utf8");

        let lines: Vec<_> = printed.lines().collect();
        assert!(
            lines[0].ends_with(&format!("<stderr> [start] run: sh -c {script}")),
            "{format:?}: {printed}"
        );
        assert!(
            printed.contains("<stdout>\n{\n  \"id\": 1\n}"),
            "{format:?}: {printed}"
        );
        assert!(printed.contains("<stderr> [raw] ready"), "{format:?}: {printed}");
        assert!(
            lines
                .last()
                .expect("output")
                .ends_with("<stderr> [end] command exited with: 0"),
            "{format:?}: {printed}"
        );
    }
}

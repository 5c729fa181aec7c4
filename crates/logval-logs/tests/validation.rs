use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use logval_logs::{
    AssertRequest, CancellationToken, ExpectedLogRecords, ExpectedRecord, ListenRequest,
    LogFormat, LogSource, LogTypeConfig, ResetRequest, Session, ValidatorConfig,
};

const INDEXED_LOG: &str = r#"{"Timestamp":"2018-01-12T14:07:09.120207-08:00","EventType":"event1","EventID":"eeed0b0c-f7e4-11e7-b54f-784f438e6f38","ClientIP":"127.0.0.1:52141","Request":{"Method":"GET","URL":"http://127.0.0.1:8777/event1/?k1=v1"},"Error":""}
{"Timestamp":"2018-01-12T14:07:09.122259-08:00","EventType":"event1","EventID":"eeed4c70-f7e4-11e7-b54f-784f438e6f38","ClientIP":"127.0.0.1:52141","Request":{"Method":"GET","URL":"http://127.0.0.1:8777/event1/?k10=v1"},"Error":""}
{"Timestamp":"2018-01-12T14:07:09.123185-08:00","EventType":"event2","EventID":"eeed709c-f7e4-11e7-b54f-784f438e6f38","ClientIP":"127.0.0.1:52141","Request":{"Method":"GET","URL":"http://127.0.0.1:8777/event2/?k1=v1"},"Error":""}
{"Timestamp":"2018-01-12T14:07:09.123199-08:00","EventType":"event2","EventID":"eeed709c-f7e4-11e7-b54f-784f438e6f30","ClientIP":"127.0.0.1:52141","Request":{"Method":"GET","URL":"http://127.0.0.1:8777/event2/?k1=v1"},"Error":""}
"#;

/// Three JSON records with k5 = 10, 20, 30
fn log_content(multiplier: i64) -> String {
    (1..=3)
        .map(|i| {
            format!(
                "{{\"k1\":\"v1\",\"k2\":[\"1\",\"2\",\"{}\"],\"k3\":123,\"k4\":{{\"s1\":1,\"s2\":\"{}\"}},\"k5\":{}}}\n",
                multiplier * i,
                101,
                10 * i
            )
        })
        .collect()
}

fn listen_json(session: &Session, dir: &Path) {
    session
        .listen(&ListenRequest {
            source: LogSource::new(dir.display().to_string()),
            types: vec![LogTypeConfig::new("t", LogFormat::JsonLines, "*.log")],
        })
        .unwrap();
}

fn expect_k5(values: &[&str]) -> AssertRequest {
    AssertRequest::new(vec![ExpectedLogRecords::new(
        "t",
        values
            .iter()
            .map(|v| ExpectedRecord::new().with("k5", *v))
            .collect(),
    )])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn files_written_apart_in_time_are_all_matched() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::default();
    listen_json(&session, dir.path());

    let writer_dir = dir.path().to_path_buf();
    let writer = std::thread::spawn(move || {
        for i in 0..2 {
            fs::write(writer_dir.join(format!("test{}.log", i)), log_content(i + 1)).unwrap();
            std::thread::sleep(Duration::from_millis(150));
        }
    });

    let request = expect_k5(&["10", "20", "30", "10"]).with_wait(300, 3);
    let response = session
        .assert(&request, &CancellationToken::new())
        .await
        .unwrap();
    writer.join().unwrap();

    assert_eq!(response.validation_info.len(), 4);
    for info in &response.validation_info {
        assert!(info.failed_tests.is_empty(), "{:?}", info.failed_tests);
    }

    // Consumption does not carry over to the next call
    let response = session
        .assert(&expect_k5(&["20"]), &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.is_success());

    session
        .reset(&ResetRequest {
            log_types: vec!["t".to_string()],
        })
        .unwrap();
}

#[tokio::test]
async fn indexed_records_match_conjunctively() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("endly_test_indexed.log");
    fs::write(&log, INDEXED_LOG).unwrap();

    let session = Session::default();
    let listen = session
        .listen(&ListenRequest {
            source: LogSource::new(log.display().to_string()),
            types: vec![
                LogTypeConfig::new("t", LogFormat::JsonLines, "endly_test_indexed.log")
                    .with_index_expr(r#""EventID":"([^"]+)""#),
            ],
        })
        .unwrap();
    assert_eq!(listen.meta["t"].log_files.len(), 1);

    let expected = vec![
        ExpectedRecord::new()
            .with("EventType", "event1")
            .with("EventID", "eeed4c70-f7e4-11e7-b54f-784f438e6f38")
            .with("Timestamp", "2018-01-12T14:07:09.122259-08:00"),
        ExpectedRecord::new()
            .with("EventType", "event1")
            .with("EventID", "eeed0b0c-f7e4-11e7-b54f-784f438e6f38")
            .with("Timestamp", "2018-01-12T14:07:09.120207-08:00"),
        ExpectedRecord::new()
            .with("Timestamp", "2018-01-12T14:07:09.123185-08:00")
            .with("EventType", "event2"),
        ExpectedRecord::new()
            .with("Timestamp", "2018-01-12T14:07:09.123185-08:00")
            .with("EventType", "event2")
            .with("EventID", "eeed709c-f7e4-11e7-b54f-784f438e6f30"),
    ];
    let request = AssertRequest::new(vec![ExpectedLogRecords::new("t", expected)]);
    let response = session
        .assert(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.validation_info.len(), 4);
    for info in &response.validation_info[..3] {
        assert_eq!(info.test_failed, 0, "{:?}", info.failed_tests);
    }
    assert_eq!(response.validation_info[3].test_failed, 1);

    let by_key = session
        .records_by_key("t", "eeed709c-f7e4-11e7-b54f-784f438e6f30")
        .unwrap();
    assert_eq!(by_key.len(), 1);
    assert_eq!(
        by_key[0].field("Request.Method").map(|v| v.to_string()),
        Some("\"GET\"".to_string())
    );
}

#[tokio::test]
async fn reset_hides_previous_records() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.log"), log_content(1)).unwrap();
    let session = Session::default();
    listen_json(&session, dir.path());

    let cancel = CancellationToken::new();
    assert!(
        session
            .assert(&expect_k5(&["10"]), &cancel)
            .await
            .unwrap()
            .is_success()
    );

    session
        .reset(&ResetRequest {
            log_types: vec!["t".to_string()],
        })
        .unwrap();
    let response = session.assert(&expect_k5(&["10"]), &cancel).await.unwrap();
    assert_eq!(response.failed_count(), 1);

    // Offsets were kept, so only content written after the reset shows up
    let mut file = OpenOptions::new()
        .append(true)
        .open(dir.path().join("a.log"))
        .unwrap();
    file.write_all(b"{\"k5\":40}\n").unwrap();
    let response = session
        .assert(&expect_k5(&["40", "10"]), &cancel)
        .await
        .unwrap();
    assert!(!response.validation_info[0].has_failed());
    assert!(response.validation_info[1].has_failed());
}

#[tokio::test]
async fn reset_with_rewind_rereads_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.log"), log_content(1)).unwrap();
    let session = Session::new(ValidatorConfig::default().with_reset_rewind(true));
    listen_json(&session, dir.path());

    let cancel = CancellationToken::new();
    session.assert(&expect_k5(&["10"]), &cancel).await.unwrap();
    session
        .reset(&ResetRequest {
            log_types: vec!["t".to_string()],
        })
        .unwrap();

    let response = session
        .assert(&expect_k5(&["10", "20", "30"]), &cancel)
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn retries_do_not_overrun_their_budget() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::default();
    listen_json(&session, dir.path());

    let started = Instant::now();
    let response = session
        .assert(&expect_k5(&["10"]).with_wait(50, 3), &CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.failed_count(), 1);
    assert!(elapsed >= Duration::from_millis(150), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "{:?}", elapsed);
}

#[tokio::test]
async fn cancellation_cuts_the_wait_short() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::default();
    listen_json(&session, dir.path());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let response = session
        .assert(&expect_k5(&["10"]).with_wait(10_000, 10), &cancel)
        .await
        .unwrap();

    assert_eq!(response.failed_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn line_completed_between_attempts_is_decoded_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.log");
    fs::write(&path, "{\"k5\":").unwrap();
    let session = Session::default();
    listen_json(&session, dir.path());

    let cancel = CancellationToken::new();
    let response = session.assert(&expect_k5(&["70"]), &cancel).await.unwrap();
    assert_eq!(response.failed_count(), 1);

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"70}\n").unwrap();
    let response = session
        .assert(&expect_k5(&["70", "70"]), &cancel)
        .await
        .unwrap();
    assert!(!response.validation_info[0].has_failed());
    assert!(response.validation_info[1].has_failed());
    assert_eq!(session.log_type("t").unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn groups_across_log_types_keep_order_and_separate_claims() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a-1.log"), "{\"k\":\"1\"}\n").unwrap();
    fs::write(dir.path().join("b-1.log"), "{\"k\":\"1\"}\n{\"k\":\"2\"}\n").unwrap();

    let session = Session::default();
    let listen = session
        .listen(&ListenRequest {
            source: LogSource::new(dir.path().display().to_string()),
            types: vec![
                LogTypeConfig::new("a", LogFormat::JsonLines, "a-*.log"),
                LogTypeConfig::new("b", LogFormat::JsonLines, "b-*.log"),
            ],
        })
        .unwrap();
    assert_eq!(listen.meta["a"].log_files.len(), 1);
    assert_eq!(listen.meta["b"].log_files.len(), 1);

    let k = |v: &str| ExpectedRecord::new().with("k", v);
    let request = AssertRequest::new(vec![
        ExpectedLogRecords::new("a", vec![k("1")]),
        ExpectedLogRecords::new("b", vec![k("1"), k("2")]),
        ExpectedLogRecords::new("a", vec![k("1")]),
    ]);
    let response = session
        .assert(&request, &CancellationToken::new())
        .await
        .unwrap();

    let outcomes: Vec<_> = response
        .validation_info
        .iter()
        .map(|info| (info.log_type.as_str(), info.index, info.has_failed()))
        .collect();
    // a's only record is claimed by the first group; b's claims do not touch it
    assert_eq!(
        outcomes,
        vec![
            ("a", 0, false),
            ("b", 0, false),
            ("b", 1, false),
            ("a", 0, true),
        ]
    );
    assert_eq!(session.log_type("a").unwrap().len(), 1);
    assert_eq!(session.log_type("b").unwrap().len(), 2);
}

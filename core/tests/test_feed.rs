mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::StubServer;
use plantwatch_core::config::FeedConfig;
use plantwatch_core::feed::{numeric_prefix, parse_feed_json, FeedClient, FeedPoller, FetchError};
use plantwatch_core::retry::RetryPolicy;

const FEED_JSON: &str = r#"{
  "channel": {"id": 3187167, "name": "HydroNail", "description": null, "last_entry_id": 42},
  "feeds": [
    {"created_at": "2026-01-05T10:00:00Z", "entry_id": 41,
     "field1": "7.12", "field2": "18.5", "field3": "26.0", "field4": "7.9",
     "field5": "310", "field6": "420", "field7": "1.1", "field8": "140"},
    {"created_at": "2026-01-05T10:00:15Z", "entry_id": 42,
     "field1": "nan?", "field2": null, "field3": " 25.5 ", "field4": "",
     "field5": "300", "field6": "410", "field7": "1.0"}
  ]
}"#;

fn feed_cfg(base_url: &str) -> FeedConfig {
    FeedConfig {
        base_url: base_url.to_string(),
        channel_id: "3187167".into(),
        results: 2,
        poll_interval_secs: 15,
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, base_delay_ms: 1 }
}

#[test]
fn feed_fields_map_to_sample_and_bad_values_read_zero() {
    let readings = parse_feed_json(FEED_JSON).unwrap();
    assert_eq!(readings.len(), 2);

    let first = &readings[0];
    assert_eq!(first.entry_id, 41);
    assert_eq!(first.sample.ph, 7.12);
    assert_eq!(first.sample.dissolved_oxygen, 7.9);
    assert_eq!(first.sample.hardness, 140.0);

    let second = &readings[1];
    assert_eq!(second.sample.ph, 0.0);
    assert_eq!(second.sample.turbidity, 0.0);
    assert_eq!(second.sample.temperature, 25.5);
    assert_eq!(second.sample.dissolved_oxygen, 0.0);
    assert_eq!(second.sample.hardness, 0.0);
    assert!(second.timestamp > first.timestamp);
}

#[test]
fn fields_with_units_keep_their_leading_number() {
    let body = r#"{
      "channel": {"id": 1},
      "feeds": [{"created_at": "2026-01-05T10:00:00Z", "entry_id": 1,
                 "field1": "7.2 pH", "field2": "12NTU", "field3": "-1.5e1C",
                 "field4": ".5", "field5": "pH 7", "field6": "3e", "field7": "+0.4mg"}]
    }"#;
    let s = parse_feed_json(body).unwrap()[0].sample;
    assert_eq!(s.ph, 7.2);
    assert_eq!(s.turbidity, 12.0);
    assert_eq!(s.temperature, -15.0);
    assert_eq!(s.dissolved_oxygen, 0.5);
    assert_eq!(s.tds, 0.0);
    assert_eq!(s.conductivity, 3.0);
    assert_eq!(s.chlorine, 0.4);

    assert_eq!(numeric_prefix("  250 ppm"), Some(250.0));
    assert_eq!(numeric_prefix("-"), None);
    assert_eq!(numeric_prefix("abc"), None);
}

#[test]
fn malformed_feed_is_a_decode_error() {
    assert!(matches!(parse_feed_json("{\"feeds\": 3}"), Err(FetchError::Decode(_))));
}

#[test]
fn client_retries_server_errors_then_succeeds() {
    let server = StubServer::start(vec![
        (500, "{}".to_string()),
        (502, "{}".to_string()),
        (200, FEED_JSON.to_string()),
    ]);
    let client = FeedClient::new(&feed_cfg(&server.base_url), fast_retry());
    let readings = client.fetch(2).unwrap();
    assert_eq!(readings.len(), 2);

    let seen = server.finish();
    assert_eq!(seen.len(), 3);
    assert!(seen[2].starts_with("GET /channels/3187167/feeds.json?results=2"), "{}", seen[2]);
}

#[test]
fn client_surfaces_failure_after_three_attempts() {
    let server = StubServer::start(vec![
        (500, "{}".to_string()),
        (500, "{}".to_string()),
        (404, "{}".to_string()),
    ]);
    let client = FeedClient::new(&feed_cfg(&server.base_url), fast_retry());
    match client.fetch(20) {
        Err(FetchError::Status(404)) => {}
        other => panic!("expected last status 404, got {other:?}"),
    }
    assert_eq!(server.finish().len(), 3);
}

#[test]
fn poller_delivers_batches_until_stopped() {
    let ticks = Arc::new(AtomicU32::new(0));
    let t = Arc::clone(&ticks);
    let (mut poller, rx) = FeedPoller::spawn(Duration::from_millis(10), move || {
        let n = t.fetch_add(1, Ordering::SeqCst);
        if n == 1 {
            Err("transient")
        } else {
            Ok(n)
        }
    });

    let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first, 0);
    // tick 1 failed and was skipped
    assert_eq!(second, 2);

    poller.stop();
    assert!(!poller.is_running());
    let after_stop = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
}

#[test]
fn dropping_poller_cancels_thread() {
    let ticks = Arc::new(AtomicU32::new(0));
    let t = Arc::clone(&ticks);
    let (poller, rx) = FeedPoller::spawn(Duration::from_secs(3600), move || {
        t.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(())
    });
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    // long interval: drop must interrupt the wait rather than block for an hour
    drop(poller);
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

use std::time::Duration;

use plantwatch_core::retry::{retry_with, RetryPolicy};

#[test]
fn succeeds_on_third_attempt_with_linear_backoff() {
    let policy = RetryPolicy::default();
    let mut slept = Vec::new();
    let mut calls = Vec::new();

    let out: Result<&str, String> = retry_with(
        &policy,
        |d| slept.push(d),
        |attempt| {
            calls.push(attempt);
            if attempt < 3 {
                Err(format!("HTTP 503 on attempt {attempt}"))
            } else {
                Ok("payload")
            }
        },
    );

    assert_eq!(out, Ok("payload"));
    assert_eq!(calls, [1, 2, 3]);
    assert_eq!(slept, [Duration::from_secs(1), Duration::from_secs(2)]);
}

#[test]
fn gives_up_after_max_attempts_with_last_error() {
    let policy = RetryPolicy::default();
    let mut slept = 0;
    let out: Result<(), String> = retry_with(
        &policy,
        |_| slept += 1,
        |attempt| Err(format!("fail {attempt}")),
    );
    assert_eq!(out, Err("fail 3".to_string()));
    // no sleep after the final failure
    assert_eq!(slept, 2);
}

#[test]
fn first_success_never_sleeps() {
    let policy = RetryPolicy::default();
    let out: Result<u32, String> = retry_with(&policy, |_| panic!("slept"), |a| Ok(a));
    assert_eq!(out, Ok(1));
}

#[test]
fn zero_attempts_still_tries_once() {
    let policy = RetryPolicy { max_attempts: 0, base_delay_ms: 10 };
    let mut calls = 0;
    let out: Result<(), &str> = retry_with(&policy, |_| {}, |_| {
        calls += 1;
        Err("down")
    });
    assert!(out.is_err());
    assert_eq!(calls, 1);
}

#[test]
fn delay_grows_with_attempt_number() {
    let p = RetryPolicy { max_attempts: 5, base_delay_ms: 250 };
    assert_eq!(p.delay_for(1), Duration::from_millis(250));
    assert_eq!(p.delay_for(4), Duration::from_millis(1000));
}

use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;
use ureq::Agent;

use crate::config::FeedConfig;
use crate::models::WaterQualitySample;
use crate::retry::{retry, RetryPolicy};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("could not decode feed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_entry_id: Option<u64>,
}

/// One feed row; field1..field8 arrive as strings (or null).
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    pub created_at: DateTime<Utc>,
    pub entry_id: u64,
    #[serde(default)]
    pub field1: Option<String>,
    #[serde(default)]
    pub field2: Option<String>,
    #[serde(default)]
    pub field3: Option<String>,
    #[serde(default)]
    pub field4: Option<String>,
    #[serde(default)]
    pub field5: Option<String>,
    #[serde(default)]
    pub field6: Option<String>,
    #[serde(default)]
    pub field7: Option<String>,
    #[serde(default)]
    pub field8: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedResponse {
    pub channel: ChannelInfo,
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedReading {
    pub entry_id: u64,
    pub timestamp: DateTime<Utc>,
    pub sample: WaterQualitySample,
}

/// Longest leading decimal number (`"7.2 pH"` -> 7.2, `"12NTU"` -> 12).
/// Leading whitespace is skipped; no leading number gives None.
pub fn numeric_prefix(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let b = t.as_bytes();
    let digits = |from: usize| b[from..].iter().take_while(|c| c.is_ascii_digit()).count();

    let mut end = 0;
    if matches!(b.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_len = digits(end);
    end += int_len;
    let mut frac_len = 0;
    if b.get(end) == Some(&b'.') {
        frac_len = digits(end + 1);
        if frac_len > 0 || int_len > 0 {
            end += 1 + frac_len;
        }
    }
    if int_len == 0 && frac_len == 0 {
        return None;
    }
    // exponent only counts when digits follow it
    if matches!(b.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(b.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_len = digits(exp);
        if exp_len > 0 {
            end = exp + exp_len;
        }
    }
    t[..end].parse().ok()
}

fn field_or_zero(f: &Option<String>) -> f64 {
    f.as_deref()
        .and_then(numeric_prefix)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Fields without a leading number (or missing) read as 0.0.
pub fn parse_entry(e: &FeedEntry) -> FeedReading {
    FeedReading {
        entry_id: e.entry_id,
        timestamp: e.created_at,
        sample: WaterQualitySample {
            ph: field_or_zero(&e.field1),
            turbidity: field_or_zero(&e.field2),
            temperature: field_or_zero(&e.field3),
            dissolved_oxygen: field_or_zero(&e.field4),
            tds: field_or_zero(&e.field5),
            conductivity: field_or_zero(&e.field6),
            chlorine: field_or_zero(&e.field7),
            hardness: field_or_zero(&e.field8),
        },
    }
}

pub fn parse_feed_json(body: &str) -> Result<Vec<FeedReading>, FetchError> {
    let resp: FeedResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(resp.feeds.iter().map(parse_entry).collect())
}

/// Public IoT channel client.
pub struct FeedClient {
    agent: Agent,
    base_url: String,
    channel_id: String,
    retry: RetryPolicy,
}

impl FeedClient {
    pub fn new(cfg: &FeedConfig, retry: RetryPolicy) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();
        Self {
            agent,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            channel_id: cfg.channel_id.clone(),
            retry,
        }
    }

    pub fn feed_url(&self, results: u32) -> String {
        format!(
            "{}/channels/{}/feeds.json?results={}",
            self.base_url, self.channel_id, results
        )
    }

    fn fetch_once(&self, url: &str) -> Result<Vec<FeedReading>, FetchError> {
        let resp = match self.agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status(code)),
            Err(e) => return Err(FetchError::Transport(e.to_string())),
        };
        let body = resp
            .into_string()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        parse_feed_json(&body)
    }

    /// Latest `results` entries, retried per the client's policy.
    pub fn fetch(&self, results: u32) -> Result<Vec<FeedReading>, FetchError> {
        let url = self.feed_url(results);
        retry(&self.retry, |_| self.fetch_once(&url))
    }
}

/// Background fixed-interval poller. Stopping (or dropping) cancels and joins the thread.
pub struct FeedPoller {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FeedPoller {
    /// Calls `poll` immediately and then every `interval`, forwarding successes to the
    /// returned receiver. Failures are logged and the next tick proceeds.
    pub fn spawn<T, E, F>(interval: Duration, mut poll: F) -> (Self, Receiver<T>)
    where
        T: Send + 'static,
        E: std::fmt::Display,
        F: FnMut() -> Result<T, E> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (data_tx, data_rx) = crossbeam_channel::unbounded::<T>();

        let handle = thread::spawn(move || {
            info!("feed poller started ({:?})", interval);
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                match poll() {
                    Ok(batch) => {
                        if data_tx.send(batch).is_err() {
                            // receiver gone
                            break;
                        }
                    }
                    Err(e) => warn!("feed poll failed: {}", e),
                }

                match shutdown_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
            info!("feed poller stopped");
        });

        (
            Self {
                shutdown: Some(shutdown_tx),
                handle: Some(handle),
            },
            data_rx,
        )
    }

    /// Polls `client` for `results` entries every `cfg.poll_interval_secs`.
    pub fn for_client(client: FeedClient, cfg: &FeedConfig) -> (Self, Receiver<Vec<FeedReading>>) {
        let results = cfg.results;
        Self::spawn(Duration::from_secs(cfg.poll_interval_secs), move || {
            client.fetch(results)
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for FeedPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

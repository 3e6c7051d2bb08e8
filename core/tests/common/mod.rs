#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use plantwatch_core::models::WaterQualitySample;

pub fn optimal_sample() -> WaterQualitySample {
    WaterQualitySample {
        ph: 7.2,
        turbidity: 15.0,
        temperature: 25.0,
        dissolved_oxygen: 8.0,
        tds: 250.0,
        conductivity: 350.0,
        chlorine: 1.2,
        hardness: 120.0,
    }
}

pub fn degraded_sample() -> WaterQualitySample {
    WaterQualitySample {
        ph: 5.5,
        turbidity: 65.0,
        temperature: 38.0,
        dissolved_oxygen: 3.0,
        tds: 850.0,
        conductivity: 950.0,
        chlorine: 0.1,
        hardness: 420.0,
    }
}

/// Loopback HTTP stub: answers one connection per canned `(status, body)` and
/// returns the request lines it saw (request line + body).
pub struct StubServer {
    pub base_url: String,
    handle: Option<JoinHandle<Vec<String>>>,
}

impl StubServer {
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    let lower = line.to_ascii_lowercase();
                    if let Some(v) = lower.strip_prefix("content-length:") {
                        content_length = v.trim().parse().unwrap_or(0);
                    }
                }
                let mut req_body = vec![0u8; content_length];
                reader.read_exact(&mut req_body).unwrap();
                seen.push(format!(
                    "{} {}",
                    request_line.trim_end(),
                    String::from_utf8_lossy(&req_body)
                ));

                let mut stream = stream;
                let reason = if status == 200 { "OK" } else { "Error" };
                let resp = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(resp.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            seen
        });
        Self {
            base_url: format!("http://{addr}"),
            handle: Some(handle),
        }
    }

    /// Waits for every canned response to be served.
    pub fn finish(mut self) -> Vec<String> {
        self.handle.take().unwrap().join().unwrap()
    }
}

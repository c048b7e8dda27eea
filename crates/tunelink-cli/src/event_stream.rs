//! Server-sent event transport for `/events`.
//!
//! Owns connection lifecycle and reconnects; frames are forwarded verbatim to
//! the engine, which does all decoding.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tunelink_core::engine::EngineHandle;

/// Reconnect delay: doubles after each failure, capped at `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Backoff {
    pub(crate) initial: Duration,
    pub(crate) max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

/// Delay between reconnect attempts. Starts over after every successful connect.
struct ReconnectDelay {
    backoff: Backoff,
    current: Duration,
}

impl ReconnectDelay {
    fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            current: backoff.initial,
        }
    }

    fn connected(&mut self) {
        self.current = self.backoff.initial;
    }

    /// Wait before the next attempt; the one after waits longer.
    fn next_wait(&mut self) -> Duration {
        let wait = self.current;
        self.current = self.backoff.next(wait);
        wait
    }
}

/// Incremental `text/event-stream` parser yielding each event's `data`.
#[derive(Default)]
pub(crate) struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed a chunk; returns the data payloads of every event it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if !self.data.is_empty() {
                    out.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        out
    }
}

enum StreamEnd {
    /// Server closed the stream.
    Closed,
    /// Engine no longer accepts frames.
    EngineStopped,
}

/// Keep `/events` connected and forward frames until the engine stops.
pub(crate) async fn run_event_stream(
    client: reqwest::Client,
    url: String,
    engine: EngineHandle,
    backoff: Backoff,
) {
    let mut delay = ReconnectDelay::new(backoff);
    loop {
        match connect(&client, &url).await {
            Ok(resp) => {
                tracing::info!(%url, "event stream connected");
                delay.connected();
                match forward(resp, &engine).await {
                    Ok(StreamEnd::EngineStopped) => {
                        tracing::debug!("engine stopped; closing event stream");
                        return;
                    }
                    Ok(StreamEnd::Closed) => {
                        tracing::info!("event stream closed by server; reconnecting");
                    }
                    Err(e) => {
                        tracing::warn!(error = %format!("{e:#}"), "event stream interrupted");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "event stream connect failed");
            }
        }
        let wait = delay.next_wait();
        tracing::debug!(delay_ms = wait.as_millis() as u64, "reconnecting event stream");
        tokio::time::sleep(wait).await;
    }
}

async fn connect(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .context("connect /events")?;
    if !resp.status().is_success() {
        return Err(anyhow::anyhow!("events failed with {}", resp.status()));
    }
    Ok(resp)
}

async fn forward(resp: reqwest::Response, engine: &EngineHandle) -> Result<StreamEnd> {
    let mut decoder = SseDecoder::default();
    let mut body = resp.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("read /events")?;
        for frame in decoder.push(&chunk) {
            if !engine.push_frame(frame) {
                return Ok(StreamEnd::EngineStopped);
            }
        }
    }
    Ok(StreamEnd::Closed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_events_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"seco").is_empty());
        assert!(decoder.push(b"nds\": 1.5}\n").is_empty());
        assert_eq!(decoder.push(b"\n"), vec![r#"{"seconds": 1.5}"#.to_string()]);
    }

    #[test]
    fn ignores_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b": ping\n\nevent: status\nid: 4\ndata: {}\n\n");
        assert_eq!(frames, vec!["{}".to_string()]);
    }

    #[test]
    fn joins_multi_line_data_and_handles_crlf() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b"data: a\r\ndata:b\r\n\r\ndata: c\n\n");
        assert_eq!(frames, vec!["a\nb".to_string(), "c".to_string()]);
    }

    #[test]
    fn keeps_multibyte_characters_split_between_chunks() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: \"é\"\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["\"é\"".to_string()]);
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let backoff = Backoff::default();
        let mut delay = backoff.initial;
        let mut seen = Vec::new();
        for _ in 0..6 {
            delay = backoff.next(delay);
            seen.push(delay.as_millis());
        }
        assert_eq!(seen, vec![500, 1000, 2000, 4000, 5000, 5000]);
    }

    #[test]
    fn reconnect_delay_starts_over_after_connecting() {
        let mut delay = ReconnectDelay::new(Backoff::default());
        let failures: Vec<u128> = (0..3).map(|_| delay.next_wait().as_millis()).collect();
        assert_eq!(failures, vec![250, 500, 1000]);

        delay.connected();
        assert_eq!(delay.next_wait(), Duration::from_millis(250));
        assert_eq!(delay.next_wait(), Duration::from_millis(500));
    }
}

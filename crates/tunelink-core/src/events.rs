//! Event-stream frame handling.
//!
//! Each frame runs, in order: bootstrap reconciliation, index correction,
//! advance evaluation, display update. Nothing here returns an error; a bad
//! frame is logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tunelink_types::{PlayRequest, StreamFrame};

use crate::advance::{AdvancePolicy, next_index};
use crate::gateway::PlayerGateway;
use crate::notify::{Level, NotificationSink};
use crate::store::QueueStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Not valid JSON, or not an object of the expected shape.
    Malformed(String),
    /// Decoded, but carries none of `seconds`, `currentIndex`, `isPlaying`.
    NoRecognizedFields,
}

/// What a handled frame did to local state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// A bootstrap fetch replaced the local queue.
    pub reconciled: bool,
    /// The frame's index overrode the local one.
    pub index_corrected: bool,
    /// Index advanced to after a successful auto-advance.
    pub advanced_to: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Dropped(DropReason),
    Handled(FrameReport),
}

/// Decode raw frame text.
pub fn decode_frame(raw: &str) -> Result<StreamFrame, DropReason> {
    let frame: StreamFrame =
        serde_json::from_str(raw).map_err(|e| DropReason::Malformed(e.to_string()))?;
    if !frame.has_fields() {
        return Err(DropReason::NoRecognizedFields);
    }
    Ok(frame)
}

/// Suppresses advance evaluation while position reports may still come from
/// the track that was just left.
#[derive(Clone, Copy, Debug)]
struct AdvanceGuard {
    /// Position at which the advance fired.
    at: f64,
    /// Length of the outgoing track in seconds.
    outgoing_secs: f64,
    /// The outgoing track has finished by then.
    expires: Instant,
}

impl AdvanceGuard {
    fn new(at: f64, outgoing_duration_ms: u64) -> Self {
        let outgoing_secs = outgoing_duration_ms as f64 / 1000.0;
        let remaining = (outgoing_secs - at).max(0.0);
        Self {
            at,
            outgoing_secs,
            expires: Instant::now() + Duration::from_secs_f64(remaining),
        }
    }

    /// `true` when `seconds` can only belong to the new track.
    fn released_by(&self, seconds: f64) -> bool {
        seconds < self.at || seconds > self.outgoing_secs || Instant::now() >= self.expires
    }
}

pub struct EventDispatcher {
    gateway: Arc<dyn PlayerGateway>,
    sink: Arc<dyn NotificationSink>,
    policy: AdvancePolicy,
    guard: Option<AdvanceGuard>,
}

impl EventDispatcher {
    pub fn new(
        gateway: Arc<dyn PlayerGateway>,
        sink: Arc<dyn NotificationSink>,
        policy: AdvancePolicy,
    ) -> Self {
        Self {
            gateway,
            sink,
            policy,
            guard: None,
        }
    }

    /// Decode and apply one raw frame.
    pub async fn handle(&mut self, store: &mut QueueStore, raw: &str) -> FrameOutcome {
        match decode_frame(raw) {
            Ok(frame) => FrameOutcome::Handled(self.apply(store, frame).await),
            Err(reason) => {
                tracing::debug!(?reason, frame = %raw, "dropping event frame");
                FrameOutcome::Dropped(reason)
            }
        }
    }

    /// Apply an already decoded frame.
    pub async fn apply(&mut self, store: &mut QueueStore, frame: StreamFrame) -> FrameReport {
        let mut report = FrameReport::default();

        if store.is_unknown() {
            report.reconciled = self.reconcile(store).await;
        }

        if let Some(remote) = frame.current_index {
            report.index_corrected = self.correct_index(store, remote);
        }

        if let Some(seconds) = frame.seconds {
            report.advanced_to = self.maybe_advance(store, seconds).await;
        }

        let is_playing = frame.is_playing.or(frame.seconds.map(|_| true));
        store.record_position(frame.seconds, is_playing);
        store.publish_display();
        report
    }

    async fn reconcile(&mut self, store: &mut QueueStore) -> bool {
        tracing::debug!("local queue unknown; fetching from backend");
        match self.gateway.get_queue().await {
            Some(queue) => store.replace_queue(queue),
            None => {
                tracing::debug!("backend returned no queue");
                false
            }
        }
    }

    fn correct_index(&mut self, store: &mut QueueStore, remote: i64) -> bool {
        let Ok(remote) = usize::try_from(remote) else {
            tracing::debug!(remote, "ignoring negative remote index");
            return false;
        };
        if store.is_empty() || store.current_index() == Some(remote) {
            return false;
        }
        tracing::info!(from = ?store.current_index(), to = remote, "adopting remote queue index");
        let changed = store.set_current_index(remote);
        if changed {
            self.guard = None;
        }
        changed
    }

    async fn maybe_advance(&mut self, store: &mut QueueStore, seconds: f64) -> Option<usize> {
        if let Some(guard) = self.guard {
            if !guard.released_by(seconds) {
                tracing::trace!(seconds, at = guard.at, "waiting for next track to start");
                return None;
            }
            self.guard = None;
        }

        let duration_ms = store.current_entry()?.track.as_ref()?.duration_ms;
        if !self.policy.should_advance(duration_ms, seconds) {
            return None;
        }

        let Some(next) = next_index(store.queue()) else {
            tracing::trace!(seconds, "end of queue; nothing to advance to");
            return None;
        };
        let queue = store.queue().with_index(next)?;
        let Some(track) = queue.entry(next).and_then(|e| e.track.clone()) else {
            tracing::warn!(index = next, "next queue entry has no track data; not advancing");
            return None;
        };

        tracing::info!(
            seconds,
            duration_ms,
            next,
            track_id = %track.id,
            "auto-advancing to next track"
        );
        let request = PlayRequest::for_track(&track, false, queue);
        match self.gateway.play(&request).await {
            Ok(_) => {
                store.set_current_index(next);
                self.guard = Some(AdvanceGuard::new(seconds, duration_ms));
                self.sink.message(
                    Level::Info,
                    format!("Playing: {} by {}", track.name, track.artist_names().join(", ")),
                );
                Some(next)
            }
            Err(e) => {
                tracing::warn!(error = %e, next, "auto-advance request failed");
                self.sink
                    .message(Level::Warn, format!("Failed to play next track: {e}"));
                None
            }
        }
    }
}

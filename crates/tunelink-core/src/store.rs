//! Local mirror of the remote queue and last known playback position.
//!
//! Pure in-memory state; every effective change is pushed to the sink.

use std::sync::Arc;

use tunelink_types::{Queue, QueueEntry};

use crate::notify::{DisplayState, Notification, NotificationSink, format_elapsed};

/// Derived view of queue + position, rebuilt on demand.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub queue: Queue,
    pub elapsed_seconds: Option<f64>,
    pub is_playing: bool,
}

pub struct QueueStore {
    queue: Queue,
    elapsed_seconds: Option<f64>,
    is_playing: bool,
    sink: Arc<dyn NotificationSink>,
}

impl QueueStore {
    /// Empty store; the position is unknown until a queue is adopted.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            queue: Queue::default(),
            elapsed_seconds: None,
            is_playing: false,
            sink,
        }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.queue.current_index
    }

    /// `true` when the queue is empty or the index is unset.
    pub fn is_unknown(&self) -> bool {
        self.queue.is_empty() || self.queue.current_index.is_none()
    }

    pub fn current_entry(&self) -> Option<&QueueEntry> {
        self.queue.current_entry()
    }

    pub fn entry_at(&self, index: usize) -> Option<&QueueEntry> {
        self.queue.entry(index)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Replace the whole mirror. Returns `true` when the track list or index
    /// changed (and a notification went out).
    pub fn replace_queue(&mut self, queue: Queue) -> bool {
        let queue = queue.normalized();
        if queue == self.queue {
            tracing::trace!("queue replace is a no-op");
            return false;
        }
        tracing::debug!(
            len = queue.len(),
            index = ?queue.current_index,
            "queue replaced"
        );
        self.queue = queue;
        self.sink.notify(Notification::QueueChanged(self.queue.clone()));
        true
    }

    /// Point at `index`. Out-of-range indices are ignored; re-setting the
    /// current index is a no-op.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index >= self.queue.len() {
            tracing::warn!(index, len = self.queue.len(), "ignoring out-of-range queue index");
            return false;
        }
        if self.queue.current_index == Some(index) {
            return false;
        }
        tracing::debug!(from = ?self.queue.current_index, to = index, "queue index changed");
        self.queue.current_index = Some(index);
        self.sink.notify(Notification::QueueChanged(self.queue.clone()));
        true
    }

    /// Record the latest position report. Absent fields keep their value.
    pub fn record_position(&mut self, seconds: Option<f64>, is_playing: Option<bool>) {
        if let Some(seconds) = seconds {
            self.elapsed_seconds = Some(seconds);
        }
        if let Some(is_playing) = is_playing {
            self.is_playing = is_playing;
        }
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            queue: self.queue.clone(),
            elapsed_seconds: self.elapsed_seconds,
            is_playing: self.is_playing,
        }
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            is_playing: self.is_playing,
            elapsed: self.elapsed_seconds.map(format_elapsed),
            title: self
                .current_entry()
                .and_then(|entry| entry.track.as_ref())
                .map(|track| track.display_title()),
        }
    }

    /// Push the current display line to the sink.
    pub fn publish_display(&self) {
        self.sink.notify(Notification::Display(self.display_state()));
    }
}

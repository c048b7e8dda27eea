//! Change notifications pushed to rendering surfaces.

use tokio::sync::mpsc;
use tunelink_types::Queue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Render-ready playback line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub is_playing: bool,
    /// Elapsed position formatted as `m:ss`.
    pub elapsed: Option<String>,
    /// `"Title - Artists"` of the current entry.
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// Track list or current index changed.
    QueueChanged(Queue),
    Display(DisplayState),
    /// User-facing message.
    Message { level: Level, text: String },
}

/// Receiver of state changes. The engine pushes; sinks never pull.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);

    fn message(&self, level: Level, text: String) {
        self.notify(Notification::Message { level, text });
    }
}

/// Forwards notifications over an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        // Receiver gone means nobody renders anymore.
        let _ = self.sender.send(notification);
    }
}

/// Format elapsed seconds as `m:ss`.
pub fn format_elapsed(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let mins = total / 60;
    let secs = total % 60;
    format!("{mins}:{secs:02}")
}

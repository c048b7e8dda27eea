//! Terminal rendering of engine notifications.
//!
//! The playback line is redrawn in place; messages, queue changes and console
//! output are printed on their own lines above it.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tunelink_core::notify::{DisplayState, Level, Notification};
use tunelink_types::{Queue, QueueEntry};

pub(crate) fn status_text(display: &DisplayState) -> String {
    if !display.is_playing {
        return match display.title.as_deref() {
            Some(title) => format!("⏸ Paused - {title}"),
            None => "⏸ Paused".to_string(),
        };
    }
    let title = display.title.as_deref().unwrap_or("Playing...");
    match display.elapsed.as_deref() {
        Some(elapsed) => format!("▶ {title} [{elapsed}]"),
        None => format!("▶ {title}"),
    }
}

pub(crate) fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

/// Numbered listing line, 1-based.
pub(crate) fn entry_label(position: usize, entry: &QueueEntry, current: bool) -> String {
    let marker = if current { ">" } else { " " };
    let origin = if entry.from_queue { " [queued]" } else { "" };
    match entry.track.as_ref() {
        Some(track) => format!(
            "{marker} {:>3}. {} ({}){origin}",
            position + 1,
            track.display_title(),
            format_duration_ms(track.duration_ms)
        ),
        None => format!("{marker} {:>3}. <unavailable>{origin}", position + 1),
    }
}

pub(crate) fn queue_lines(queue: &Queue) -> Vec<String> {
    if queue.is_empty() {
        return vec!["queue is empty".to_string()];
    }
    queue
        .tracks
        .iter()
        .enumerate()
        .map(|(i, entry)| entry_label(i, entry, queue.current_index == Some(i)))
        .collect()
}

fn queue_summary(queue: &Queue) -> String {
    let now = queue
        .current_entry()
        .and_then(|e| e.track.as_ref())
        .map(|t| t.display_title())
        .unwrap_or_else(|| "-".into());
    match queue.current_index {
        Some(i) => format!("queue: {}/{} {now}", i + 1, queue.len()),
        None => format!("queue: {} tracks", queue.len()),
    }
}

/// Keeps track of the in-place status line.
#[derive(Default)]
pub(crate) struct StatusPrinter {
    last_status: String,
    status_shown: bool,
}

impl StatusPrinter {
    pub(crate) fn handle(
        &mut self,
        notification: &Notification,
        out: &mut impl Write,
    ) -> io::Result<()> {
        match notification {
            Notification::Display(display) => {
                let text = status_text(display);
                if self.status_shown && text == self.last_status {
                    return Ok(());
                }
                write!(out, "\r\x1b[2K{text}")?;
                self.last_status = text;
                self.status_shown = true;
            }
            Notification::QueueChanged(queue) => {
                self.line(out, &queue_summary(queue))?;
            }
            Notification::Message { level, text } => {
                let line = match level {
                    Level::Info => text.clone(),
                    Level::Warn => format!("warning: {text}"),
                    Level::Error => format!("error: {text}"),
                };
                self.line(out, &line)?;
            }
        }
        out.flush()
    }

    /// Print a full line above the status line, then redraw it.
    pub(crate) fn line(&mut self, out: &mut impl Write, text: &str) -> io::Result<()> {
        if self.status_shown {
            write!(out, "\r\x1b[2K")?;
        }
        writeln!(out, "{text}")?;
        if self.status_shown {
            write!(out, "{}", self.last_status)?;
        }
        Ok(())
    }
}

/// Stdout shared by the notification task and the console, so console lines
/// also clear and redraw the status line.
#[derive(Clone, Default)]
pub(crate) struct Terminal {
    printer: Arc<Mutex<StatusPrinter>>,
}

impl Terminal {
    fn printer(&self) -> MutexGuard<'_, StatusPrinter> {
        self.printer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn render(&self, notification: &Notification) -> io::Result<()> {
        self.render_to(notification, &mut io::stdout().lock())
    }

    pub(crate) fn say(&self, text: &str) -> io::Result<()> {
        self.say_to(&mut io::stdout().lock(), text)
    }

    fn render_to(&self, notification: &Notification, out: &mut impl Write) -> io::Result<()> {
        self.printer().handle(notification, out)
    }

    fn say_to(&self, out: &mut impl Write, text: &str) -> io::Result<()> {
        self.printer().line(out, text)?;
        out.flush()
    }
}

/// Render notifications to stdout until the engine drops its sink.
pub(crate) async fn print_notifications(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    terminal: Terminal,
) {
    while let Some(notification) = rx.recv().await {
        if let Err(e) = terminal.render(&notification) {
            tracing::warn!(error = %e, "failed to write status");
            return;
        }
    }
    println!();
}

//! Test doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tunelink_types::{
    ActionResult, Album, Artist, Library, PlayRequest, Queue, QueueEntry, QueueUpdate,
    SearchResponse, ToggleResponse, Track, TracksKind, TracksResponse,
};

use crate::gateway::{GatewayError, PlayerGateway};
use crate::notify::{ChannelSink, Notification, NotificationSink};

pub(crate) fn track(id: &str, duration_ms: u64) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Track {id}"),
        artists: vec![Artist {
            name: "Artist".into(),
            ..Artist::default()
        }],
        album: Album {
            name: "Album".into(),
            ..Album::default()
        },
        duration_ms,
    }
}

pub(crate) fn entry(id: &str, duration_ms: u64) -> QueueEntry {
    QueueEntry::new(track(id, duration_ms), false)
}

/// Queue with tracks `t0..tN` of the given durations.
pub(crate) fn queue_of(durations: &[u64], index: Option<usize>) -> Queue {
    let tracks = durations
        .iter()
        .enumerate()
        .map(|(i, d)| entry(&format!("t{i}"), *d))
        .collect();
    Queue::new(tracks, index)
}

pub(crate) fn recording_sink() -> (
    Arc<dyn NotificationSink>,
    mpsc::UnboundedReceiver<Notification>,
) {
    let (sink, rx) = ChannelSink::new();
    (Arc::new(sink), rx)
}

pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

/// Scripted gateway that records every mutating call.
#[derive(Default)]
pub(crate) struct MockGateway {
    pub(crate) plays: Mutex<Vec<PlayRequest>>,
    pub(crate) adds: Mutex<Vec<(QueueEntry, usize)>>,
    pub(crate) removes: Mutex<Vec<QueueEntry>>,
    pub(crate) queue_fetches: Mutex<usize>,
    /// Successive `get_queue` answers; `None` once exhausted.
    pub(crate) queues: Mutex<VecDeque<Option<Queue>>>,
    pub(crate) play_error: Mutex<Option<GatewayError>>,
    pub(crate) toggle_result: Mutex<Option<Result<ToggleResponse, GatewayError>>>,
    pub(crate) update_result: Mutex<Option<QueueUpdate>>,
    pub(crate) ping_after: Mutex<Option<usize>>,
    pub(crate) pings: Mutex<usize>,
}

impl MockGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_queue(&self, queue: Option<Queue>) {
        self.queues.lock().unwrap().push_back(queue);
    }

    pub(crate) fn fail_play(&self, err: GatewayError) {
        *self.play_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn played_ids(&self) -> Vec<String> {
        self.plays
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.track_id.clone())
            .collect()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        *self.queue_fetches.lock().unwrap()
    }
}

#[async_trait]
impl PlayerGateway for MockGateway {
    async fn library(&self) -> Result<Library, GatewayError> {
        Ok(Library::default())
    }

    async fn tracks(&self, _id: &str, _kind: TracksKind) -> Result<TracksResponse, GatewayError> {
        Err(GatewayError::Status(404))
    }

    async fn search(&self, _query: &str) -> Result<SearchResponse, GatewayError> {
        Ok(SearchResponse::default())
    }

    async fn play(&self, request: &PlayRequest) -> Result<ActionResult, GatewayError> {
        self.plays.lock().unwrap().push(request.clone());
        match self.play_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(ActionResult {
                status: "ok".into(),
                message: Some("track is now playing".into()),
            }),
        }
    }

    async fn toggle(&self) -> Result<ToggleResponse, GatewayError> {
        self.toggle_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Err(GatewayError::Transport("no toggle scripted".into())))
    }

    async fn get_queue(&self) -> Option<Queue> {
        *self.queue_fetches.lock().unwrap() += 1;
        self.queues.lock().unwrap().pop_front().flatten()
    }

    async fn add_to_queue(&self, entry: &QueueEntry, index: usize) -> QueueUpdate {
        self.adds.lock().unwrap().push((entry.clone(), index));
        self.update_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| QueueUpdate::success("Added"))
    }

    async fn remove_from_queue(&self, entry: &QueueEntry) -> QueueUpdate {
        self.removes.lock().unwrap().push(entry.clone());
        self.update_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| QueueUpdate::success("Removed"))
    }

    async fn ping(&self) -> bool {
        let mut pings = self.pings.lock().unwrap();
        *pings += 1;
        match *self.ping_after.lock().unwrap() {
            Some(n) => *pings >= n,
            None => false,
        }
    }
}

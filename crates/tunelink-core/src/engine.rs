//! Single-consumer engine loop.
//!
//! Stream frames and user commands share one channel and are handled one at a
//! time in arrival order, so the queue store is never mutated concurrently.
//! A command's remote call completes before the next input is taken, which
//! makes "last write wins" follow completion order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tunelink_types::{
    Library, PlayerAction, Queue, QueueEntry, SearchResponse, TracksKind, TracksResponse,
};

use crate::advance::AdvancePolicy;
use crate::commands::{CommandDispatcher, CommandError};
use crate::events::{EventDispatcher, FrameOutcome};
use crate::gateway::PlayerGateway;
use crate::notify::NotificationSink;
use crate::store::{PlaybackSnapshot, QueueStore};

type Reply<T> = oneshot::Sender<Result<T, CommandError>>;

/// Inputs accepted by the engine loop.
pub enum EngineInput {
    /// Raw event-stream frame text.
    Frame(String),
    PlayAt {
        queue: Queue,
        index: usize,
        skip: bool,
        reply: Reply<()>,
    },
    Next { reply: Reply<usize> },
    Previous { reply: Reply<usize> },
    Toggle { reply: Reply<PlayerAction> },
    AddToQueue {
        entry: QueueEntry,
        index: usize,
        reply: Reply<()>,
    },
    RemoveFromQueue { entry: QueueEntry, reply: Reply<()> },
    Library { reply: Reply<Library> },
    Tracks {
        id: String,
        kind: TracksKind,
        reply: Reply<TracksResponse>,
    },
    Search { query: String, reply: Reply<SearchResponse> },
    Snapshot { reply: oneshot::Sender<PlaybackSnapshot> },
}

pub struct Engine {
    store: QueueStore,
    events: EventDispatcher,
    commands: CommandDispatcher,
    inputs: mpsc::UnboundedReceiver<EngineInput>,
}

impl Engine {
    /// Build an engine with an empty queue and a handle to feed it.
    pub fn new(
        gateway: Arc<dyn PlayerGateway>,
        sink: Arc<dyn NotificationSink>,
        policy: AdvancePolicy,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            store: QueueStore::new(sink.clone()),
            events: EventDispatcher::new(gateway.clone(), sink.clone(), policy),
            commands: CommandDispatcher::new(gateway, sink),
            inputs: rx,
        };
        (engine, EngineHandle { tx })
    }

    /// Process inputs until every handle is dropped. Returns the final queue.
    pub async fn run(mut self) -> Queue {
        tracing::debug!("engine loop started");
        while let Some(input) = self.inputs.recv().await {
            self.dispatch(input).await;
        }
        tracing::debug!("engine loop finished");
        self.store.queue().clone()
    }

    async fn dispatch(&mut self, input: EngineInput) {
        let store = &mut self.store;
        let commands = &self.commands;
        match input {
            EngineInput::Frame(raw) => {
                if let FrameOutcome::Handled(report) = self.events.handle(store, &raw).await {
                    tracing::trace!(?report, "frame handled");
                }
            }
            EngineInput::PlayAt {
                queue,
                index,
                skip,
                reply,
            } => {
                let _ = reply.send(commands.play_at(store, queue, index, skip).await);
            }
            EngineInput::Next { reply } => {
                let _ = reply.send(commands.next(store).await);
            }
            EngineInput::Previous { reply } => {
                let _ = reply.send(commands.previous(store).await);
            }
            EngineInput::Toggle { reply } => {
                let _ = reply.send(commands.toggle_play_pause(store).await);
            }
            EngineInput::AddToQueue {
                entry,
                index,
                reply,
            } => {
                let _ = reply.send(commands.add_to_queue(store, entry, index).await);
            }
            EngineInput::RemoveFromQueue { entry, reply } => {
                let _ = reply.send(commands.remove_from_queue(store, entry).await);
            }
            EngineInput::Library { reply } => {
                let _ = reply.send(commands.library().await);
            }
            EngineInput::Tracks { id, kind, reply } => {
                let _ = reply.send(commands.tracks(&id, kind).await);
            }
            EngineInput::Search { query, reply } => {
                let _ = reply.send(commands.search(&query).await);
            }
            EngineInput::Snapshot { reply } => {
                let _ = reply.send(store.snapshot());
            }
        }
    }
}

/// Cloneable sender side of the engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineInput>,
}

impl EngineHandle {
    /// Queue a raw frame. Returns `false` once the engine has stopped.
    pub fn push_frame(&self, raw: String) -> bool {
        self.tx.send(EngineInput::Frame(raw)).is_ok()
    }

    pub async fn play_at(
        &self,
        queue: Queue,
        index: usize,
        skip: bool,
    ) -> Result<(), CommandError> {
        self.request(|reply| EngineInput::PlayAt {
            queue,
            index,
            skip,
            reply,
        })
        .await
    }

    pub async fn next(&self) -> Result<usize, CommandError> {
        self.request(|reply| EngineInput::Next { reply }).await
    }

    pub async fn previous(&self) -> Result<usize, CommandError> {
        self.request(|reply| EngineInput::Previous { reply }).await
    }

    pub async fn toggle_play_pause(&self) -> Result<PlayerAction, CommandError> {
        self.request(|reply| EngineInput::Toggle { reply }).await
    }

    pub async fn add_to_queue(&self, entry: QueueEntry, index: usize) -> Result<(), CommandError> {
        self.request(|reply| EngineInput::AddToQueue {
            entry,
            index,
            reply,
        })
        .await
    }

    pub async fn remove_from_queue(&self, entry: QueueEntry) -> Result<(), CommandError> {
        self.request(|reply| EngineInput::RemoveFromQueue { entry, reply })
            .await
    }

    pub async fn library(&self) -> Result<Library, CommandError> {
        self.request(|reply| EngineInput::Library { reply }).await
    }

    pub async fn tracks(
        &self,
        id: String,
        kind: TracksKind,
    ) -> Result<TracksResponse, CommandError> {
        self.request(|reply| EngineInput::Tracks { id, kind, reply })
            .await
    }

    pub async fn search(&self, query: String) -> Result<SearchResponse, CommandError> {
        self.request(|reply| EngineInput::Search { query, reply })
            .await
    }

    /// Current queue and position as seen by the engine.
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineInput::Snapshot { reply })
            .map_err(|_| CommandError::Closed)?;
        rx.await.map_err(|_| CommandError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> EngineInput,
    ) -> Result<T, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).map_err(|_| CommandError::Closed)?;
        rx.await.map_err(|_| CommandError::Closed)?
    }
}

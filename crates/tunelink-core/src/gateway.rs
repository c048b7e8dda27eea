//! Contract for the remote player backend.

use std::fmt;

use async_trait::async_trait;
use tunelink_types::{
    ActionResult, Library, PlayRequest, Queue, QueueEntry, QueueUpdate, SearchResponse,
    ToggleResponse, TracksKind, TracksResponse,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayError {
    /// Backend answered with a non-success HTTP status.
    Status(u16),
    /// Request never produced a response (connection refused, reset, ...).
    Transport(String),
    /// Response body did not match the expected shape.
    Decode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Status(code) => write!(f, "HTTP error! Status: {code}"),
            GatewayError::Transport(msg) => write!(f, "request failed: {msg}"),
            GatewayError::Decode(msg) => write!(f, "unexpected response: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Request/response and query operations against the backend player.
///
/// `get_queue`, `add_to_queue` and `remove_from_queue` never fail; transport
/// errors fold into `None` or an error `QueueUpdate`.
#[async_trait]
pub trait PlayerGateway: Send + Sync {
    async fn library(&self) -> Result<Library, GatewayError>;

    async fn tracks(&self, id: &str, kind: TracksKind) -> Result<TracksResponse, GatewayError>;

    async fn search(&self, query: &str) -> Result<SearchResponse, GatewayError>;

    /// Start playback of the request's track with the supplied queue context.
    async fn play(&self, request: &PlayRequest) -> Result<ActionResult, GatewayError>;

    /// Flip pause state; the response reports the resulting state.
    async fn toggle(&self) -> Result<ToggleResponse, GatewayError>;

    /// Authoritative queue, or `None` when unavailable for any reason.
    async fn get_queue(&self) -> Option<Queue>;

    async fn add_to_queue(&self, entry: &QueueEntry, index: usize) -> QueueUpdate;

    async fn remove_from_queue(&self, entry: &QueueEntry) -> QueueUpdate;

    /// `true` when the backend answers at all.
    async fn ping(&self) -> bool;
}

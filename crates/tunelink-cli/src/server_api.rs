use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tunelink_core::gateway::{GatewayError, PlayerGateway};
use tunelink_types::{
    ActionResult, Library, PlayRequest, Queue, QueueAddRequest, QueueEntry, QueueRemoveRequest,
    QueueUpdate, SearchResponse, ToggleResponse, TracksKind, TracksResponse,
};

/// JSON-over-HTTP client for the player backend.
pub(crate) struct HttpGateway {
    base: String,
    client: reqwest::Client,
    events_client: reqwest::Client,
}

impl HttpGateway {
    pub(crate) fn new(server: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("build http client")?;
        // The event stream is unbounded; only the connect phase may time out.
        let events_client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .context("build event stream client")?;
        Ok(Self {
            base: server.trim_end_matches('/').to_string(),
            client,
            events_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub(crate) fn events_url(&self) -> String {
        self.url("/events")
    }

    pub(crate) fn events_client(&self) -> reqwest::Client {
        self.events_client.clone()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        label: &str,
    ) -> Result<T, GatewayError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| transport(label, e))?;
        read_json(resp, label).await
    }
}

#[async_trait]
impl PlayerGateway for HttpGateway {
    async fn library(&self) -> Result<Library, GatewayError> {
        self.get_json("/library", "library").await
    }

    async fn tracks(&self, id: &str, kind: TracksKind) -> Result<TracksResponse, GatewayError> {
        let path = format!(
            "/tracks?id={}&type={}",
            urlencoding::encode(id),
            kind.as_str()
        );
        self.get_json(&path, "tracks").await
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, GatewayError> {
        let path = format!("/search?q={}", urlencoding::encode(query));
        self.get_json(&path, "search").await
    }

    async fn play(&self, request: &PlayRequest) -> Result<ActionResult, GatewayError> {
        let resp = self
            .client
            .post(self.url("/player/play"))
            .json(request)
            .send()
            .await
            .map_err(|e| transport("player/play", e))?;
        read_json(resp, "player/play").await
    }

    async fn toggle(&self) -> Result<ToggleResponse, GatewayError> {
        self.get_json("/player", "player").await
    }

    async fn get_queue(&self) -> Option<Queue> {
        match self.get_json::<Queue>("/player/queue", "player/queue").await {
            Ok(queue) => Some(queue.normalized()),
            Err(e) => {
                tracing::debug!(error = %e, "queue fetch failed");
                None
            }
        }
    }

    async fn add_to_queue(&self, entry: &QueueEntry, index: usize) -> QueueUpdate {
        let body = QueueAddRequest {
            track: entry.clone(),
            index,
        };
        let result = match self
            .client
            .post(self.url("/player/queue/add"))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => read_json::<QueueUpdate>(resp, "player/queue/add").await,
            Err(e) => Err(transport("player/queue/add", e)),
        };
        result.unwrap_or_else(|e| QueueUpdate::error(e.to_string()))
    }

    async fn remove_from_queue(&self, entry: &QueueEntry) -> QueueUpdate {
        let body = QueueRemoveRequest {
            track: entry.clone(),
        };
        let result = match self
            .client
            .delete(self.url("/player/queue/remove"))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => read_json::<QueueUpdate>(resp, "player/queue/remove").await,
            Err(e) => Err(transport("player/queue/remove", e)),
        };
        result.unwrap_or_else(|e| QueueUpdate::error(e.to_string()))
    }

    async fn ping(&self) -> bool {
        match self.client.get(self.url("/")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ping failed");
                false
            }
        }
    }
}

fn transport(label: &str, e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(format!("request /{label}: {e}"))
}

async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    label: &str,
) -> Result<T, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), "/{label} returned an error status");
        return Err(GatewayError::Status(status.as_u16()));
    }
    let body = resp
        .text()
        .await
        .map_err(|e| GatewayError::Transport(format!("read /{label} response body: {e}")))?;
    decode_body(&body, label)
}

fn decode_body<T: DeserializeOwned>(body: &str, label: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body)
        .map_err(|e| GatewayError::Decode(format!("decode /{label} response: {e}")))
}

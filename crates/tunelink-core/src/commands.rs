//! User-initiated playback and queue commands.
//!
//! Every mutating command calls the backend first and touches local state
//! only after it succeeded. Failures are reported to the sink and returned.

use std::fmt;
use std::sync::Arc;

use tunelink_types::{
    Library, PlayRequest, PlayerAction, Queue, QueueEntry, SearchResponse, TracksKind,
    TracksResponse,
};

use crate::gateway::{GatewayError, PlayerGateway};
use crate::notify::{Level, NotificationSink};
use crate::store::QueueStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Index out of bounds or the entry has no track data.
    InvalidSelection { index: usize },
    /// Next/previous has no entry to move to.
    NoSuchTrack,
    /// Backend refused a queue edit.
    Rejected(String),
    Gateway(GatewayError),
    /// The engine task is no longer running.
    Closed,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::InvalidSelection { index } => write!(
                f,
                "could not play item {index}; select a valid track"
            ),
            CommandError::NoSuchTrack => write!(f, "no track to move to"),
            CommandError::Rejected(msg) => write!(f, "{msg}"),
            CommandError::Gateway(e) => write!(f, "{e}"),
            CommandError::Closed => write!(f, "player engine stopped"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Gateway(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GatewayError> for CommandError {
    fn from(e: GatewayError) -> Self {
        CommandError::Gateway(e)
    }
}

pub struct CommandDispatcher {
    gateway: Arc<dyn PlayerGateway>,
    sink: Arc<dyn NotificationSink>,
}

impl CommandDispatcher {
    pub fn new(gateway: Arc<dyn PlayerGateway>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { gateway, sink }
    }

    /// Play `queue[index]` and adopt `queue` as the local mirror.
    ///
    /// `skip` marks explicit next/previous navigation; a first-time selection
    /// passes `false`.
    pub async fn play_at(
        &self,
        store: &mut QueueStore,
        queue: Queue,
        index: usize,
        skip: bool,
    ) -> Result<(), CommandError> {
        let result = self.play_at_inner(store, queue, index, skip).await;
        self.surface(result, "Failed to play track")
    }

    async fn play_at_inner(
        &self,
        store: &mut QueueStore,
        queue: Queue,
        index: usize,
        skip: bool,
    ) -> Result<(), CommandError> {
        let Some(target) = queue.with_index(index) else {
            return Err(CommandError::InvalidSelection { index });
        };
        let Some(track) = target.entry(index).and_then(|e| e.track.clone()) else {
            return Err(CommandError::InvalidSelection { index });
        };

        tracing::info!(index, skip, track_id = %track.id, "play request");
        let request = PlayRequest::for_track(&track, skip, target.clone());
        self.gateway.play(&request).await?;

        store.replace_queue(target);
        store.set_playing(true);
        store.publish_display();
        self.sink.message(
            Level::Info,
            format!("Playing: {} by {}", track.name, track.artist_names().join(", ")),
        );
        Ok(())
    }

    /// Skip forward one entry. Returns the new index.
    pub async fn next(&self, store: &mut QueueStore) -> Result<usize, CommandError> {
        let target = store
            .current_index()
            .map(|i| i + 1)
            .filter(|i| store.entry_at(*i).is_some());
        self.step(store, target).await
    }

    /// Skip back one entry. Returns the new index.
    pub async fn previous(&self, store: &mut QueueStore) -> Result<usize, CommandError> {
        let target = store
            .current_index()
            .and_then(|i| i.checked_sub(1))
            .filter(|i| store.entry_at(*i).is_some());
        self.step(store, target).await
    }

    async fn step(
        &self,
        store: &mut QueueStore,
        target: Option<usize>,
    ) -> Result<usize, CommandError> {
        let Some(index) = target else {
            tracing::debug!(
                current = ?store.current_index(),
                len = store.queue().len(),
                "no track to step to"
            );
            return self.surface(Err(CommandError::NoSuchTrack), "Cannot change track");
        };
        let queue = store.queue().clone();
        self.play_at(store, queue, index, true).await?;
        Ok(index)
    }

    /// Toggle pause on the backend; only the displayed play flag changes locally.
    pub async fn toggle_play_pause(
        &self,
        store: &mut QueueStore,
    ) -> Result<PlayerAction, CommandError> {
        let result = self.gateway.toggle().await.map_err(CommandError::from);
        let response = self.surface(result, "Failed to toggle play/pause")?;
        store.set_playing(response.action == PlayerAction::Playing);
        store.publish_display();
        let label = match response.action {
            PlayerAction::Paused => "paused",
            PlayerAction::Playing => "playing",
        };
        self.sink.message(Level::Info, format!("Player: {label}"));
        Ok(response.action)
    }

    /// Insert `entry` at `index` in the remote queue, then reconcile.
    pub async fn add_to_queue(
        &self,
        store: &mut QueueStore,
        entry: QueueEntry,
        index: usize,
    ) -> Result<(), CommandError> {
        let update = self.gateway.add_to_queue(&entry, index).await;
        if !update.is_success() {
            return self.surface(Err(CommandError::Rejected(update.message)), "Failed to add track");
        }
        tracing::info!(index, "track added to remote queue");
        self.reconcile(store, "Track added to queue").await;
        Ok(())
    }

    /// Remove `entry` from the remote queue, then reconcile.
    pub async fn remove_from_queue(
        &self,
        store: &mut QueueStore,
        entry: QueueEntry,
    ) -> Result<(), CommandError> {
        let update = self.gateway.remove_from_queue(&entry).await;
        if !update.is_success() {
            return self.surface(
                Err(CommandError::Rejected(update.message)),
                "Failed to remove track",
            );
        }
        tracing::info!("track removed from remote queue");
        self.reconcile(store, "Track removed from queue").await;
        Ok(())
    }

    // Structural edits are never spliced locally; the backend copy wins.
    async fn reconcile(&self, store: &mut QueueStore, done: &str) {
        match self.gateway.get_queue().await {
            Some(queue) => {
                store.replace_queue(queue);
                self.sink.message(Level::Info, done.to_string());
            }
            None => {
                tracing::warn!("queue refresh failed after edit; keeping local queue");
                self.sink.message(
                    Level::Warn,
                    format!("{done}, but the queue could not be refreshed"),
                );
            }
        }
    }

    pub async fn library(&self) -> Result<Library, CommandError> {
        let result = self.gateway.library().await.map_err(CommandError::from);
        self.surface(result, "Failed to fetch library")
    }

    pub async fn tracks(&self, id: &str, kind: TracksKind) -> Result<TracksResponse, CommandError> {
        let result = self.gateway.tracks(id, kind).await.map_err(CommandError::from);
        self.surface(result, "Failed to fetch tracks")
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse, CommandError> {
        let result = self.gateway.search(query).await.map_err(CommandError::from);
        self.surface(result, "Search failed")
    }

    fn surface<T>(&self, result: Result<T, CommandError>, what: &str) -> Result<T, CommandError> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "{what}");
            self.sink.message(Level::Error, format!("{what}: {e}"));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notification;
    use crate::testing::{MockGateway, drain, entry, queue_of, recording_sink};
    use tunelink_types::{QueueUpdate, ToggleResponse};

    fn setup(
        queue: Option<Queue>,
    ) -> (
        Arc<MockGateway>,
        CommandDispatcher,
        QueueStore,
        tokio::sync::mpsc::UnboundedReceiver<Notification>,
    ) {
        let gateway = MockGateway::new();
        let (sink, mut rx) = recording_sink();
        let mut store = QueueStore::new(sink.clone());
        if let Some(queue) = queue {
            store.replace_queue(queue);
        }
        drain(&mut rx);
        let commands = CommandDispatcher::new(gateway.clone(), sink);
        (gateway, commands, store, rx)
    }

    fn has_error(events: &[Notification]) -> bool {
        events
            .iter()
            .any(|n| matches!(n, Notification::Message { level: Level::Error, .. }))
    }

    #[tokio::test]
    async fn play_at_adopts_queue_after_success() {
        let (gateway, commands, mut store, _rx) = setup(None);
        let listing = queue_of(&[1000, 2000, 3000], None);

        commands.play_at(&mut store, listing, 1, false).await.unwrap();

        let plays = gateway.plays.lock().unwrap();
        assert_eq!(plays[0].track_id, "t1");
        assert!(!plays[0].is_skip);
        assert_eq!(plays[0].queue.current_index, Some(1));
        assert_eq!(store.current_index(), Some(1));
        assert_eq!(store.queue().len(), 3);
        assert!(store.is_playing());
    }

    #[tokio::test]
    async fn play_at_rejects_bad_selection_before_remote_call() {
        let (gateway, commands, mut store, mut rx) = setup(None);
        let mut listing = queue_of(&[1000], None);

        let err = commands.play_at(&mut store, listing.clone(), 3, false).await;
        assert_eq!(err, Err(CommandError::InvalidSelection { index: 3 }));

        listing.tracks[0].track = None;
        let err = commands.play_at(&mut store, listing, 0, false).await;
        assert_eq!(err, Err(CommandError::InvalidSelection { index: 0 }));

        assert!(gateway.played_ids().is_empty());
        assert!(store.is_empty());
        assert!(has_error(&drain(&mut rx)));
    }

    #[tokio::test]
    async fn play_failure_leaves_state_untouched() {
        let (gateway, commands, mut store, mut rx) = setup(Some(queue_of(&[1000, 1000], Some(0))));
        gateway.fail_play(GatewayError::Status(500));

        let err = commands.next(&mut store).await;

        assert_eq!(err, Err(CommandError::Gateway(GatewayError::Status(500))));
        assert_eq!(store.current_index(), Some(0));
        assert!(has_error(&drain(&mut rx)));
    }

    #[tokio::test]
    async fn next_at_last_index_fails() {
        let (gateway, commands, mut store, _rx) = setup(Some(queue_of(&[1000, 1000], Some(1))));
        let before = store.snapshot();

        assert_eq!(commands.next(&mut store).await, Err(CommandError::NoSuchTrack));

        assert!(gateway.played_ids().is_empty());
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn previous_at_first_index_fails() {
        let (gateway, commands, mut store, _rx) = setup(Some(queue_of(&[1000, 1000], Some(0))));
        assert_eq!(commands.previous(&mut store).await, Err(CommandError::NoSuchTrack));
        assert!(gateway.played_ids().is_empty());
        assert_eq!(store.current_index(), Some(0));
    }

    #[tokio::test]
    async fn next_and_previous_on_unknown_queue_fail() {
        let (_gateway, commands, mut store, _rx) = setup(None);
        assert_eq!(commands.next(&mut store).await, Err(CommandError::NoSuchTrack));
        assert_eq!(commands.previous(&mut store).await, Err(CommandError::NoSuchTrack));
    }

    #[tokio::test]
    async fn next_and_previous_send_skip_requests() {
        let (gateway, commands, mut store, _rx) =
            setup(Some(queue_of(&[1000, 1000, 1000], Some(0))));

        assert_eq!(commands.next(&mut store).await, Ok(1));
        assert_eq!(commands.next(&mut store).await, Ok(2));
        assert_eq!(commands.previous(&mut store).await, Ok(1));

        assert_eq!(gateway.played_ids(), vec!["t1", "t2", "t1"]);
        assert!(gateway.plays.lock().unwrap().iter().all(|p| p.is_skip));
        assert_eq!(store.current_index(), Some(1));
    }

    #[tokio::test]
    async fn toggle_updates_play_flag_only() {
        let (gateway, commands, mut store, _rx) = setup(Some(queue_of(&[1000], Some(0))));
        store.set_playing(true);
        *gateway.toggle_result.lock().unwrap() = Some(Ok(ToggleResponse {
            status: "ok".into(),
            action: PlayerAction::Paused,
        }));
        let before = store.queue().clone();

        assert_eq!(commands.toggle_play_pause(&mut store).await, Ok(PlayerAction::Paused));
        assert!(!store.is_playing());
        assert_eq!(store.queue(), &before);
    }

    #[tokio::test]
    async fn toggle_failure_keeps_flag() {
        let (_gateway, commands, mut store, mut rx) = setup(None);
        store.set_playing(true);
        assert!(commands.toggle_play_pause(&mut store).await.is_err());
        assert!(store.is_playing());
        assert!(has_error(&drain(&mut rx)));
    }

    #[tokio::test]
    async fn add_reconciles_from_backend() {
        let (gateway, commands, mut store, _rx) = setup(Some(queue_of(&[1000], Some(0))));
        gateway.push_queue(Some(queue_of(&[1000, 2000], Some(0))));

        commands
            .add_to_queue(&mut store, entry("new", 2000), 1)
            .await
            .unwrap();

        assert_eq!(gateway.adds.lock().unwrap()[0].1, 1);
        assert_eq!(gateway.fetch_count(), 1);
        assert_eq!(store.queue().len(), 2);
    }

    #[tokio::test]
    async fn add_with_failed_refresh_keeps_stale_queue() {
        let (gateway, commands, mut store, mut rx) = setup(Some(queue_of(&[1000], Some(0))));
        let before = store.queue().clone();
        gateway.push_queue(None);

        let result = commands.add_to_queue(&mut store, entry("new", 2000), 1).await;

        assert_eq!(result, Ok(()));
        assert_eq!(store.queue(), &before);
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|n| matches!(n, Notification::Message { level: Level::Warn, .. })));
    }

    #[tokio::test]
    async fn rejected_remove_skips_reconciliation() {
        let (gateway, commands, mut store, mut rx) = setup(Some(queue_of(&[1000, 1000], Some(0))));
        *gateway.update_result.lock().unwrap() = Some(QueueUpdate::error("not in queue"));

        let result = commands.remove_from_queue(&mut store, entry("t1", 1000)).await;

        assert_eq!(result, Err(CommandError::Rejected("not in queue".into())));
        assert_eq!(gateway.fetch_count(), 0);
        assert_eq!(store.queue().len(), 2);
        assert!(has_error(&drain(&mut rx)));
    }

    #[tokio::test]
    async fn remove_reconciles_from_backend() {
        let (gateway, commands, mut store, _rx) = setup(Some(queue_of(&[1000, 1000], Some(1))));
        gateway.push_queue(Some(queue_of(&[1000], Some(0))));

        commands
            .remove_from_queue(&mut store, entry("t1", 1000))
            .await
            .unwrap();

        assert_eq!(gateway.removes.lock().unwrap().len(), 1);
        assert_eq!(store.queue().len(), 1);
        assert_eq!(store.current_index(), Some(0));
    }

    #[tokio::test]
    async fn read_failures_map_to_gateway_errors() {
        let (_gateway, commands, _store, _rx) = setup(None);
        assert_eq!(
            commands.tracks("x", TracksKind::Playlist).await,
            Err(CommandError::Gateway(GatewayError::Status(404)))
        );
        assert!(commands.library().await.is_ok());
        assert!(commands.search("q").await.is_ok());
    }
}

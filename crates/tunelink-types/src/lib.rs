//! Wire types shared between the queue engine and the HTTP client.
//!
//! Field names follow the backend's JSON (camelCase for player payloads,
//! snake_case for catalog objects).

use serde::{Deserialize, Deserializer, Serialize};

/// Cover art reference.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

/// Artist as returned in library listings and track credits.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artist {
    /// Backend artist id (absent on some nested credits).
    #[serde(default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Genre tags, most relevant first.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Popularity score (0-100), if reported.
    #[serde(default)]
    pub popularity: Option<u32>,
}

/// Album reference attached to a track or listed in the library.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Album {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// A playable track. Immutable once decoded from backend data.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Backend track id.
    pub id: String,
    /// Track title.
    pub name: String,
    /// Credited artists in billing order.
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Album the track belongs to.
    #[serde(default)]
    pub album: Album,
    /// Total duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    /// Artist names in billing order.
    pub fn artist_names(&self) -> Vec<String> {
        self.artists.iter().map(|a| a.name.clone()).collect()
    }

    /// `"Title - Artist A, Artist B"`, or just the title when uncredited.
    pub fn display_title(&self) -> String {
        if self.artists.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.artist_names().join(", "))
        }
    }
}

/// One slot in a queue or track listing.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntry {
    /// Track data; the backend may return slots without it (e.g. removed items).
    #[serde(default)]
    pub track: Option<Track>,
    /// `true` when the entry came from the persistent queue rather than an
    /// ad-hoc "play now" selection.
    #[serde(rename = "isItFromQueue", default)]
    pub from_queue: bool,
}

impl QueueEntry {
    pub fn new(track: Track, from_queue: bool) -> Self {
        Self {
            track: Some(track),
            from_queue,
        }
    }
}

/// Ordered track list plus a pointer to the entry currently playing.
///
/// `current_index` is `None` when the position is unknown; a `Some` index is
/// always in bounds for `tracks`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Queue {
    #[serde(alias = "Items", default)]
    pub tracks: Vec<QueueEntry>,
    #[serde(
        rename = "currentIndex",
        default,
        deserialize_with = "deserialize_index"
    )]
    pub current_index: Option<usize>,
}

impl Queue {
    /// Build a queue, dropping an index that does not point at an entry.
    pub fn new(tracks: Vec<QueueEntry>, current_index: Option<usize>) -> Self {
        let current_index = current_index.filter(|i| *i < tracks.len());
        Self {
            tracks,
            current_index,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&QueueEntry> {
        self.tracks.get(index)
    }

    pub fn current_entry(&self) -> Option<&QueueEntry> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    /// Same track list pointing at `index`, or `None` when out of bounds.
    pub fn with_index(&self, index: usize) -> Option<Queue> {
        (index < self.tracks.len()).then(|| Queue {
            tracks: self.tracks.clone(),
            current_index: Some(index),
        })
    }

    /// Re-establish the index invariant after decoding untrusted data.
    pub fn normalized(self) -> Self {
        Self::new(self.tracks, self.current_index)
    }
}

fn deserialize_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|i| usize::try_from(i).ok()))
}

/// Body of `POST /player/play`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    #[serde(rename = "trackID")]
    pub track_id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    /// `true` for explicit next/previous navigation, `false` for a direct
    /// selection or an automatic advance.
    pub is_skip: bool,
    /// Queue context the backend should adopt.
    pub queue: Queue,
}

impl PlayRequest {
    pub fn for_track(track: &Track, is_skip: bool, queue: Queue) -> Self {
        Self {
            track_id: track.id.clone(),
            name: track.name.clone(),
            artists: track.artist_names(),
            album: track.album.name.clone(),
            is_skip,
            queue,
        }
    }
}

/// Generic `{status, message}` acknowledgement.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Player state after a toggle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAction {
    Paused,
    Playing,
}

/// Response of `GET /player`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToggleResponse {
    #[serde(default)]
    pub status: String,
    pub action: PlayerAction,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Success,
    Error,
}

/// Response of the queue add/remove endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueUpdate {
    pub status: UpdateStatus,
    #[serde(default)]
    pub message: String,
}

impl QueueUpdate {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: UpdateStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: UpdateStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UpdateStatus::Success
    }
}

/// Body of `POST /player/queue/add`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueAddRequest {
    pub track: QueueEntry,
    pub index: usize,
}

/// Body of `DELETE /player/queue/remove`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueRemoveRequest {
    pub track: QueueEntry,
}

/// One decoded frame from `/events`. Every field is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamFrame {
    /// Elapsed position of the current track in (fractional) seconds.
    pub seconds: Option<f64>,
    /// Authoritative index of the entry the backend is playing.
    pub current_index: Option<i64>,
    pub is_playing: Option<bool>,
}

impl StreamFrame {
    /// `true` when at least one recognized field is present.
    pub fn has_fields(&self) -> bool {
        self.seconds.is_some() || self.current_index.is_some() || self.is_playing.is_some()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistOwner {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistTracksRef {
    #[serde(default)]
    pub total: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<PlaylistOwner>,
    #[serde(default)]
    pub tracks: Option<PlaylistTracksRef>,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Response of `GET /library`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Library {
    #[serde(default)]
    pub playlist: Vec<Playlist>,
    #[serde(default)]
    pub artist: Vec<Artist>,
    #[serde(default)]
    pub album: Vec<Album>,
}

/// Response of `GET /tracks`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TracksResponse {
    #[serde(default)]
    pub tracks: Vec<QueueEntry>,
}

/// Source collection for `GET /tracks?type=`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TracksKind {
    Playlist,
    FollowedArtist,
    SavedTracks,
    AlbumTracks,
}

impl TracksKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TracksKind::Playlist => "playlist",
            TracksKind::FollowedArtist => "followed_artist",
            TracksKind::SavedTracks => "saved_tracks",
            TracksKind::AlbumTracks => "album_tracks",
        }
    }
}

/// One page of search results.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Show {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub total_episodes: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Audiobook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub authors: Vec<Person>,
    #[serde(default)]
    pub total_chapters: u32,
}

/// Response of `GET /search`. Sections the backend omits stay `None`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<Page<Track>>,
    #[serde(default)]
    pub artists: Option<Page<Artist>>,
    #[serde(default)]
    pub albums: Option<Page<Album>>,
    #[serde(default)]
    pub playlists: Option<Page<Playlist>>,
    #[serde(default)]
    pub shows: Option<Page<Show>>,
    #[serde(default)]
    pub episodes: Option<Page<Episode>>,
    #[serde(default)]
    pub audiobooks: Option<Page<Audiobook>>,
}

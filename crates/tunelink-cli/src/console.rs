//! Line-oriented command console on stdin.
//!
//! Commands:
//! - `play <n>`: play entry `n` of the last listing
//! - `next` / `prev`: skip within the queue
//! - `toggle`: pause/resume
//! - `queue`: show the queue (and make it the current listing)
//! - `add <n> [position]`: queue entry `n`, appended unless a position is given
//! - `remove <n>`: remove entry `n` of the last listing from the queue
//! - `library`, `tracks <kind> <id>`, `search <query>`
//! - `help`, `quit`

use std::io;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tunelink_core::commands::CommandError;
use tunelink_core::engine::EngineHandle;
use tunelink_types::{Queue, QueueEntry, TracksKind};

use crate::status_line::{Terminal, entry_label, queue_lines};

#[derive(Debug, PartialEq)]
pub(crate) enum ConsoleCommand {
    /// 0-based index into the current listing.
    Play(usize),
    Next,
    Previous,
    Toggle,
    Queue,
    Add { item: usize, position: Option<usize> },
    Remove(usize),
    Library,
    Tracks { kind: TracksKind, id: String },
    Search(String),
    Help,
    Quit,
}

const HELP: &str = concat!(
    "commands: play <n> | next | prev | toggle | queue | add <n> [pos] | remove <n> | ",
    "library | tracks <playlist|artist|saved|album> <id> | search <query> | quit"
);

/// Parse one console line. Blank lines yield `Ok(None)`.
pub(crate) fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "play" | "p" => ConsoleCommand::Play(parse_item(rest)?),
        "next" | "n" => ConsoleCommand::Next,
        "prev" | "previous" | "b" => ConsoleCommand::Previous,
        "toggle" | "pause" | "t" => ConsoleCommand::Toggle,
        "queue" | "q" => ConsoleCommand::Queue,
        "add" | "a" => {
            let mut parts = rest.split_whitespace();
            let item = parse_item(parts.next().unwrap_or(""))?;
            let position = match parts.next() {
                Some(raw) => Some(parse_item(raw)?),
                None => None,
            };
            ConsoleCommand::Add { item, position }
        }
        "remove" | "rm" => ConsoleCommand::Remove(parse_item(rest)?),
        "library" | "lib" => ConsoleCommand::Library,
        "tracks" => {
            let mut parts = rest.split_whitespace();
            let kind = match parts.next() {
                Some("playlist") => TracksKind::Playlist,
                Some("artist") => TracksKind::FollowedArtist,
                Some("saved") => TracksKind::SavedTracks,
                Some("album") => TracksKind::AlbumTracks,
                _ => return Err("usage: tracks <playlist|artist|saved|album> <id>".into()),
            };
            // Saved tracks need no id.
            let id = parts.next().unwrap_or(kind.as_str()).to_string();
            ConsoleCommand::Tracks { kind, id }
        }
        "search" | "s" => {
            if rest.is_empty() {
                return Err("usage: search <query>".into());
            }
            ConsoleCommand::Search(rest.to_string())
        }
        "help" | "h" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try help)")),
    };
    Ok(Some(cmd))
}

/// 1-based user number to 0-based index.
fn parse_item(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("expected a track number, got '{}'", raw.trim())),
    }
}

struct Console {
    engine: EngineHandle,
    /// Entries shown by the last listing command; `play`/`add`/`remove` index into it.
    listing: Vec<QueueEntry>,
    terminal: Terminal,
}

enum Flow {
    Continue,
    Quit,
}

/// Keep the value of a command that succeeded. Failures other than a stopped
/// engine were already reported through the notification sink.
fn settle<T>(result: Result<T, CommandError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CommandError::Closed) => Err(CommandError::Closed.into()),
        Err(_) => Ok(None),
    }
}

/// Read commands from stdin until `quit` or EOF. Fails once the engine stops.
pub(crate) async fn run(engine: EngineHandle, terminal: Terminal) -> Result<()> {
    let mut console = Console {
        engine,
        listing: Vec::new(),
        terminal,
    };
    console.say(HELP)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                console.say(&msg)?;
                continue;
            }
        };
        if let Flow::Quit = console.execute(cmd).await? {
            break;
        }
    }
    tracing::debug!("console finished");
    Ok(())
}

impl Console {
    fn say(&self, text: &str) -> io::Result<()> {
        self.terminal.say(text)
    }

    fn show_listing(&mut self, entries: Vec<QueueEntry>) -> io::Result<()> {
        if entries.is_empty() {
            self.say("no tracks")?;
        }
        for (i, entry) in entries.iter().enumerate() {
            let label = entry_label(i, entry, false);
            self.say(&label)?;
        }
        self.listing = entries;
        Ok(())
    }

    fn pick(&self, item: usize) -> io::Result<Option<QueueEntry>> {
        match self.listing.get(item) {
            Some(entry) => Ok(Some(entry.clone())),
            None => {
                self.say(&format!("no item {} in the last listing", item + 1))?;
                Ok(None)
            }
        }
    }

    async fn execute(&mut self, cmd: ConsoleCommand) -> Result<Flow> {
        match cmd {
            ConsoleCommand::Play(item) => {
                let queue = Queue::new(self.listing.clone(), None);
                settle(self.engine.play_at(queue, item, false).await)?;
            }
            ConsoleCommand::Next => {
                settle(self.engine.next().await)?;
            }
            ConsoleCommand::Previous => {
                settle(self.engine.previous().await)?;
            }
            ConsoleCommand::Toggle => {
                settle(self.engine.toggle_play_pause().await)?;
            }
            ConsoleCommand::Queue => {
                let snapshot = self.engine.snapshot().await?;
                for line in queue_lines(&snapshot.queue) {
                    self.say(&line)?;
                }
                self.listing = snapshot.queue.tracks;
            }
            ConsoleCommand::Add { item, position } => {
                let Some(mut entry) = self.pick(item)? else {
                    return Ok(Flow::Continue);
                };
                entry.from_queue = true;
                let position = match position {
                    Some(p) => p,
                    None => self.engine.snapshot().await?.queue.len(),
                };
                settle(self.engine.add_to_queue(entry, position).await)?;
            }
            ConsoleCommand::Remove(item) => {
                if let Some(entry) = self.pick(item)? {
                    settle(self.engine.remove_from_queue(entry).await)?;
                }
            }
            ConsoleCommand::Library => {
                if let Some(library) = settle(self.engine.library().await)? {
                    self.say("playlists:")?;
                    for p in &library.playlist {
                        let line = format!("  {} ({})", p.name, p.id);
                        self.say(&line)?;
                    }
                    self.say("artists:")?;
                    for a in &library.artist {
                        let line = format!("  {} ({})", a.name, a.id);
                        self.say(&line)?;
                    }
                    self.say("albums:")?;
                    for a in &library.album {
                        let line = format!("  {} ({})", a.name, a.id);
                        self.say(&line)?;
                    }
                }
            }
            ConsoleCommand::Tracks { kind, id } => {
                if let Some(resp) = settle(self.engine.tracks(id, kind).await)? {
                    self.show_listing(resp.tracks)?;
                }
            }
            ConsoleCommand::Search(query) => {
                if let Some(resp) = settle(self.engine.search(query).await)? {
                    let tracks = resp
                        .tracks
                        .map(|page| page.items)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|t| QueueEntry::new(t, false))
                        .collect();
                    let counts = format!(
                        "also found: {} artists, {} albums, {} playlists, {} shows, {} episodes, \
                         {} audiobooks",
                        resp.artists.map(|p| p.items.len()).unwrap_or(0),
                        resp.albums.map(|p| p.items.len()).unwrap_or(0),
                        resp.playlists.map(|p| p.items.len()).unwrap_or(0),
                        resp.shows.map(|p| p.items.len()).unwrap_or(0),
                        resp.episodes.map(|p| p.items.len()).unwrap_or(0),
                        resp.audiobooks.map(|p| p.items.len()).unwrap_or(0),
                    );
                    self.show_listing(tracks)?;
                    self.say(&counts)?;
                }
            }
            ConsoleCommand::Help => self.say(HELP)?,
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use tunelink_core::advance::AdvancePolicy;
    use tunelink_core::engine::Engine;
    use tunelink_core::notify::ChannelSink;

    use crate::server_api::HttpGateway;

    #[test]
    fn only_a_stopped_engine_is_an_error() {
        assert!(settle(Err::<(), _>(CommandError::Closed)).is_err());
        assert_eq!(settle(Err::<(), _>(CommandError::NoSuchTrack)).unwrap(), None);
        assert_eq!(settle(Ok::<_, CommandError>(3)).unwrap(), Some(3));
    }

    #[tokio::test]
    async fn commands_fail_once_the_engine_is_gone() {
        let gateway = HttpGateway::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let (sink, _rx) = ChannelSink::new();
        let (engine, handle) =
            Engine::new(Arc::new(gateway), Arc::new(sink), AdvancePolicy::default());
        drop(engine);
        let mut console = Console {
            engine: handle,
            listing: Vec::new(),
            terminal: Terminal::default(),
        };

        let err = console.execute(ConsoleCommand::Next).await.err().unwrap();
        assert!(err.to_string().contains("engine stopped"));
        assert!(console.execute(ConsoleCommand::Toggle).await.is_err());
    }

    #[test]
    fn parses_numbered_commands_as_zero_based() {
        assert_eq!(parse_command("play 1"), Ok(Some(ConsoleCommand::Play(0))));
        assert_eq!(parse_command("  rm 3 "), Ok(Some(ConsoleCommand::Remove(2))));
        assert_eq!(
            parse_command("add 2"),
            Ok(Some(ConsoleCommand::Add {
                item: 1,
                position: None
            }))
        );
        assert_eq!(
            parse_command("add 2 1"),
            Ok(Some(ConsoleCommand::Add {
                item: 1,
                position: Some(0)
            }))
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(parse_command("play 0").is_err());
        assert!(parse_command("play x").is_err());
        assert!(parse_command("play").is_err());
    }

    #[test]
    fn parses_tracks_and_search() {
        assert_eq!(
            parse_command("tracks playlist abc"),
            Ok(Some(ConsoleCommand::Tracks {
                kind: TracksKind::Playlist,
                id: "abc".into()
            }))
        );
        assert_eq!(
            parse_command("tracks saved"),
            Ok(Some(ConsoleCommand::Tracks {
                kind: TracksKind::SavedTracks,
                id: "saved_tracks".into()
            }))
        );
        assert_eq!(
            parse_command("search daft  punk"),
            Ok(Some(ConsoleCommand::Search("daft  punk".into())))
        );
        assert!(parse_command("search").is_err());
        assert!(parse_command("tracks podcast 1").is_err());
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("NEXT"), Ok(Some(ConsoleCommand::Next)));
        assert!(parse_command("dance").is_err());
    }
}

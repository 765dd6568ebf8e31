//! JSONL event log
//!
//! One file per refinement session at `{root}/{session-id}/events.jsonl`,
//! one [`EventLogEntry`] per line. A session's file is closed when it
//! settles back to idle and reopened in append mode if it emits again.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::Context;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{Event, EventLogEntry};

const LOG_FILE: &str = "events.jsonl";

fn log_path(root: &Path, session_id: &str) -> PathBuf {
    root.join(session_id).join(LOG_FILE)
}

/// The open log of one session
struct SessionLog {
    path: PathBuf,
    out: BufWriter<File>,
    lines: usize,
}

impl SessionLog {
    fn open(root: &Path, session_id: &str) -> eyre::Result<Self> {
        let path = log_path(root, session_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        debug!(?path, "SessionLog::open: called");
        Ok(Self {
            path,
            out: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Lines are flushed one at a time so a crash loses at most the current one
    fn append(&mut self, entry: &EventLogEntry) -> eyre::Result<()> {
        serde_json::to_writer(&mut self.out, entry)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.lines += 1;
        Ok(())
    }

    fn close(mut self) {
        if let Err(e) = self.out.flush() {
            warn!(path = ?self.path, error = %e, "SessionLog::close: flush failed");
        }
        debug!(path = ?self.path, lines = self.lines, "SessionLog::close: closed");
    }
}

/// Writes bus events into per-session JSONL files
pub struct EventLogger {
    root: PathBuf,
    open: HashMap<String, SessionLog>,
}

impl EventLogger {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        debug!(?root, "EventLogger::new: called");
        Self {
            root,
            open: HashMap::new(),
        }
    }

    /// Append one event to its session's log
    pub fn write_event(&mut self, event: &Event) -> eyre::Result<()> {
        let id = event.session_id();
        let log = match self.open.entry(id.to_string()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(SessionLog::open(&self.root, id)?),
        };
        log.append(&EventLogEntry::new(event.clone()))
    }

    pub fn close_session(&mut self, session_id: &str) {
        if let Some(log) = self.open.remove(session_id) {
            log.close();
        }
    }

    fn is_open(&self, session_id: &str) -> bool {
        self.open.contains_key(session_id)
    }

    fn handle(&mut self, event: Event) {
        if let Err(e) = self.write_event(&event) {
            error!(session_id = event.session_id(), error = %e, "EventLogger: event not written");
        }
        if settles(&event) {
            self.close_session(event.session_id());
        }
    }

    /// Drain the bus until every sender is gone
    pub async fn run(self, bus: Arc<EventBus>) {
        let rx = bus.subscribe();
        drop(bus);
        self.drain(rx).await;
    }

    async fn drain(mut self, mut rx: Receiver<Event>) {
        debug!("EventLogger::drain: called");
        loop {
            match rx.recv().await {
                Ok(event) => self.handle(event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "EventLogger: fell behind the bus"),
                Err(RecvError::Closed) => break,
            }
        }

        let sessions: Vec<String> = self.open.keys().cloned().collect();
        debug!(open = sessions.len(), "EventLogger::drain: bus closed");
        for id in sessions {
            self.close_session(&id);
        }
    }
}

/// A session that is back to idle has nothing more to say for now
fn settles(event: &Event) -> bool {
    matches!(event, Event::SessionChanged { state, .. } if state == "idle")
}

/// Load a session's recorded events; lines that do not parse are skipped
pub fn read_session_events(root: impl AsRef<Path>, session_id: &str) -> eyre::Result<Vec<EventLogEntry>> {
    let path = log_path(root.as_ref(), session_id);
    debug!(?path, "read_session_events: called");

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("opening {}", path.display())),
    };

    let mut entries = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(line = n + 1, error = %e, "read_session_events: skipping bad line"),
        }
    }
    Ok(entries)
}

/// Start an [`EventLogger`] on its own task.
///
/// The subscription is taken before returning, so no event emitted after this
/// call is missed.
pub fn spawn_event_logger(bus: Arc<EventBus>, root: impl AsRef<Path>) -> eyre::Result<JoinHandle<()>> {
    let root = root.as_ref();
    fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))?;
    let rx = bus.subscribe();
    Ok(tokio::spawn(EventLogger::new(root).drain(rx)))
}

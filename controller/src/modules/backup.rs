use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use shared_resources::elevator_status::ElevatorStatus;
use shared_resources::event::Event;

pub const EVENTS_FILE: &str = "events.jsonl";
pub const SNAPSHOT_FILE: &str = "snapshot.json";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("backup record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: Event,
}

/// Drains `events_rx` into `dir` until every sender is gone. Snapshots replace
/// `snapshot.json`; every other event is appended to the log. Failures are logged
/// and the event is skipped.
pub fn main(dir: PathBuf, events_rx: Receiver<Event>) {
    if let Err(e) = fs::create_dir_all(&dir) {
        warn!(dir = %dir.display(), "cannot create backup directory: {e}");
    }
    info!(dir = %dir.display(), "backup started");

    let mut log: Option<File> = None;
    for event in events_rx.iter() {
        if let Event::Snapshot { elevators } = &event {
            if let Err(e) = write_snapshot(&dir, elevators) {
                warn!("snapshot not written: {e}");
            }
            continue;
        }

        let record = Record { at_ms: now_ms(), event };
        if let Err(e) = append(&dir, &mut log, &record) {
            warn!(event = record.event.name(), "event not logged: {e}");
        }
    }

    debug!("backup channel closed");
}

/// Fleet status of the last snapshot written to `dir`, empty if there is none yet.
pub fn load_snapshot(dir: &Path) -> Result<Vec<ElevatorStatus>, BackupError> {
    let contents = match fs::read_to_string(dir.join(SNAPSHOT_FILE)) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&contents)?)
}

/// Every record in the event log of `dir`, oldest first.
pub fn load_events(dir: &Path) -> Result<Vec<Record>, BackupError> {
    let contents = match fs::read_to_string(dir.join(EVENTS_FILE)) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(BackupError::from))
        .collect()
}

fn write_snapshot(dir: &Path, elevators: &[ElevatorStatus]) -> Result<(), BackupError> {
    let staging = dir.join(format!("{SNAPSHOT_FILE}.tmp"));
    fs::write(&staging, serde_json::to_vec_pretty(elevators)?)?;
    fs::rename(&staging, dir.join(SNAPSHOT_FILE))?;
    Ok(())
}

/// Reopens the log after a failed write.
fn append(dir: &Path, log: &mut Option<File>, record: &Record) -> Result<(), BackupError> {
    let mut file = match log.take() {
        Some(file) => file,
        None => OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(EVENTS_FILE))?,
    };
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    file.write_all(&line)?;
    *log = Some(file);
    Ok(())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

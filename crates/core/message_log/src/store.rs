use crate::LogStoreError;
use bridge_utils::fs::atomically_write_file_sync;
use bridge_utils::fs::backup_file;
use clock::Clock;
use sensor_api::entry::parse_timestamp;
use sensor_api::LogEntry;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use time::Duration;
use time::OffsetDateTime;
use tracing::debug;
use tracing::warn;

pub const DEFAULT_MAX_MESSAGES: usize = 100;
pub const DEFAULT_MAX_AGE_DAYS: u32 = 30;

const MESSAGES_DIR: &str = "messages";

/// How many messages a log keeps, and for how long
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_messages: usize,
    pub max_age: Duration,
}

impl RetentionPolicy {
    pub fn new(max_messages: usize, max_age_days: u32) -> Self {
        RetentionPolicy {
            max_messages,
            max_age: Duration::days(max_age_days.into()),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::new(DEFAULT_MAX_MESSAGES, DEFAULT_MAX_AGE_DAYS)
    }
}

type LogKey = (String, String);

/// The message logs of all the sensors, stored under a data root
///
/// Each (sensor, measurement) pair has its own log, a JSON array of [LogEntry]
/// stored in `<root>/<sensor_id>/messages/<measurement>-messages.json`.
///
/// The methods are blocking. Appends to the same log are serialized,
/// while appends to different logs can proceed concurrently.
pub struct LogStore {
    root: PathBuf,
    retention: RetentionPolicy,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<LogKey, Arc<Mutex<()>>>>,
}

impl LogStore {
    pub fn new(root: impl Into<PathBuf>, retention: RetentionPolicy, clock: Arc<dyn Clock>) -> Self {
        LogStore {
            root: root.into(),
            retention,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The path of the log of a sensor measurement
    pub fn log_path(&self, sensor_id: &str, measurement: &str) -> Result<PathBuf, LogStoreError> {
        if !is_valid_path_segment(sensor_id) || !is_valid_path_segment(measurement) {
            return Err(LogStoreError::InvalidKey {
                sensor_id: sensor_id.to_string(),
                measurement: measurement.to_string(),
            });
        }
        Ok(self
            .root
            .join(sensor_id)
            .join(MESSAGES_DIR)
            .join(format!("{measurement}-messages.json")))
    }

    /// Append an entry to the log of a sensor measurement
    ///
    /// Before the new entry is added, the entries older than the maximum age are removed.
    /// Then only the most recent entries are kept, up to the maximum number of messages.
    ///
    /// A log file that cannot be parsed is backed up to `<path>.backup-<unix-millis>`
    /// and replaced by a log with only the new entry.
    ///
    /// Returns the path of the updated log.
    pub fn append(
        &self,
        sensor_id: &str,
        measurement: &str,
        entry: LogEntry,
    ) -> Result<PathBuf, LogStoreError> {
        let path = self.log_path(sensor_id, measurement)?;
        let key_lock = self.key_lock(sensor_id, measurement);
        let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| LogStoreError::CreateDirFailed {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let now = self.clock.now();
        let mut entries = self.read_for_update(&path, now)?;

        // A cutoff before the earliest representable date expires nothing
        if let Some(cutoff) = now.checked_sub(self.retention.max_age) {
            entries.retain(|entry| !is_expired(entry, cutoff));
        }

        entries.push(serde_json::to_value(entry)?);
        if entries.len() > self.retention.max_messages {
            let excess = entries.len() - self.retention.max_messages;
            entries.drain(..excess);
        }

        let content = serde_json::to_vec_pretty(&entries)?;
        atomically_write_file_sync(&path, &content).map_err(|source| {
            LogStoreError::WriteFailed {
                path: path.clone(),
                source,
            }
        })?;
        debug!("Saved message to {path:?}");
        Ok(path)
    }

    /// Read the log of a sensor measurement
    ///
    /// A missing log is empty.
    pub fn read(&self, sensor_id: &str, measurement: &str) -> Result<Vec<LogEntry>, LogStoreError> {
        let path = self.log_path(sensor_id, measurement)?;
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => return Err(LogStoreError::ReadFailed { path, source }),
        };
        serde_json::from_slice(&content).map_err(|source| LogStoreError::InvalidLog { path, source })
    }

    fn key_lock(&self, sensor_id: &str, measurement: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry((sensor_id.to_string(), measurement.to_string()))
            .or_default()
            .clone()
    }

    /// The current entries of a log, recovering from a corrupted file
    fn read_for_update(
        &self,
        path: &Path,
        now: OffsetDateTime,
    ) -> Result<Vec<Value>, LogStoreError> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => {
                return Err(LogStoreError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match serde_json::from_slice::<Value>(&content) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(entry) => Ok(vec![entry]),
            Err(err) => {
                warn!("Corrupted message log {path:?}: {err}");
                let unix_millis = now.unix_timestamp_nanos() / 1_000_000;
                let backup = backup_file(path, &unix_millis.to_string()).map_err(|source| {
                    LogStoreError::BackupFailed {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                warn!("Created backup of corrupted message log: {backup:?}");
                Ok(vec![])
            }
        }
    }
}

/// An entry is expired only if its timestamp can be read and is older than the cutoff
fn is_expired(entry: &Value, cutoff: OffsetDateTime) -> bool {
    entry
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|timestamp| parse_timestamp(timestamp, cutoff.offset()))
        .is_some_and(|received_at| received_at < cutoff)
}

fn is_valid_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

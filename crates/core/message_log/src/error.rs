use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum LogStoreError {
    #[error("Invalid message log key: sensor {sensor_id:?}, measurement {measurement:?}")]
    InvalidKey {
        sensor_id: String,
        measurement: String,
    },

    #[error("Failed to create the directory {path:?}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read the message log {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to backup the corrupted message log {path:?}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write the message log {path:?}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid message log {path:?}")]
    InvalidLog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    FromSerdeJson(#[from] serde_json::Error),
}

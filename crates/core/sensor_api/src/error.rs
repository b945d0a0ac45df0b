use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum DescriptorError {
    #[error("Failed to read {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON descriptor {path:?}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML descriptor {path:?}")]
    InvalidYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("The descriptor of sensor {sensor_id:?} has no sensor type")]
    MissingSensorType { sensor_id: String },

    #[error("The descriptor of sensor {sensor_id:?} has no location")]
    MissingLocation { sensor_id: String },
}

pub mod config_store;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod measurement;
pub mod topics;

pub use config_store::list_sensor_dirs;
pub use config_store::load_sensor_config;
pub use descriptor::Location;
pub use descriptor::SensorDescriptor;
pub use entry::LogEntry;
pub use error::DescriptorError;
pub use topics::SensorTopic;

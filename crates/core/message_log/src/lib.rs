mod error;
mod store;

pub use error::LogStoreError;
pub use store::LogStore;
pub use store::RetentionPolicy;
pub use store::DEFAULT_MAX_AGE_DAYS;
pub use store::DEFAULT_MAX_MESSAGES;

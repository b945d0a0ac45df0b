pub mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod force_update;
pub mod registry;
pub mod router;
pub mod subscriber;
pub mod writer;

pub use bridge::run;
pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use error::ConfigError;
pub use registry::SubscriptionRegistry;
pub use subscriber::SubscriptionManager;
pub use subscriber::SubscriptionOutcome;
pub use subscriber::Subscriber;

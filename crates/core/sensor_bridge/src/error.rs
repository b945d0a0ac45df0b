use crate::config::MAX_AGE_DAYS_LIMIT;
use mqtt_channel::MqttError;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    FromFigment(#[from] Box<figment::Error>),

    #[error("Invalid MQTT settings")]
    FromMqtt(#[from] MqttError),

    #[error("retention.max_messages must be greater than 0")]
    NoMessageRetained,

    #[error("retention.max_age_days must not exceed {MAX_AGE_DAYS_LIMIT}, got {0}")]
    MaxAgeTooLarge(u32),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::FromFigment(Box::new(err))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    FromConfig(#[from] ConfigError),

    #[error(transparent)]
    FromMqtt(#[from] MqttError),

    #[error("The MQTT connection has been closed before {0}")]
    ConnectionClosed(&'static str),

    #[error("Timeout while waiting for {0}")]
    Timeout(&'static str),
}

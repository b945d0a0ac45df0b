use crate::ConfigError;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Serialized;
use figment::providers::Toml;
use figment::Figment;
use message_log::RetentionPolicy;
use mqtt_channel::qos_from_level;
use mqtt_channel::QoS;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = "/etc/sensor-bridge";
pub const CONFIG_FILE: &str = "sensor-bridge.toml";
pub const ENV_PREFIX: &str = "SENSOR_BRIDGE_";

/// A hundred years
pub const MAX_AGE_DAYS_LIMIT: u32 = 36_500;

/// The configuration of the sensor bridge
///
/// Read from the built-in defaults, overridden by `<config-dir>/sensor-bridge.toml`,
/// overridden by the `SENSOR_BRIDGE_` environment variables
/// (`SENSOR_BRIDGE_MQTT__URL` setting `mqtt.url`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: MqttSettings,
    pub data: DataSettings,
    pub retention: RetentionSettings,
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub url: String,
    pub session_name: Option<String>,
    pub clean_session: bool,
    pub keep_alive_secs: u64,
    pub qos: u8,
}

impl Default for MqttSettings {
    fn default() -> Self {
        MqttSettings {
            url: "mqtt://localhost:1883".to_string(),
            session_name: Some("sensor-bridge".to_string()),
            clean_session: false,
            keep_alive_secs: 60,
            qos: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub root: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            root: PathBuf::from("/var/lib/sensor-bridge/data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    pub max_messages: usize,
    pub max_age_days: u32,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        RetentionSettings {
            max_messages: message_log::DEFAULT_MAX_MESSAGES,
            max_age_days: message_log::DEFAULT_MAX_AGE_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub debounce_ms: u64,
    /// 0 disables the periodic re-scans
    pub rescan_interval_secs: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        DiscoverySettings {
            debounce_ms: 500,
            rescan_interval_secs: 60,
        }
    }
}

impl BridgeConfig {
    /// Load the configuration stored in `config_dir`, if any
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(config_dir))
    }

    /// Extract and validate the configuration from the given sources
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: BridgeConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(config_dir: &Path) -> Figment {
        Figment::from(Serialized::defaults(BridgeConfig::default()))
            .merge(Toml::file(config_dir.join(CONFIG_FILE)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn with_broker_url(mut self, url: impl Into<String>) -> Self {
        self.mqtt.url = url.into();
        self
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data.root = root.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention.max_messages == 0 {
            return Err(ConfigError::NoMessageRetained);
        }
        if self.retention.max_age_days > MAX_AGE_DAYS_LIMIT {
            return Err(ConfigError::MaxAgeTooLarge(self.retention.max_age_days));
        }
        self.mqtt_config()?;
        self.qos()?;
        Ok(())
    }

    pub fn mqtt_config(&self) -> Result<mqtt_channel::Config, ConfigError> {
        let config = mqtt_channel::Config::from_url(&self.mqtt.url)?
            .with_clean_session(self.mqtt.clean_session)
            .with_keep_alive(Duration::from_secs(self.mqtt.keep_alive_secs));
        Ok(match &self.mqtt.session_name {
            Some(session_name) if !session_name.is_empty() => {
                config.with_session_name(session_name.clone())
            }
            _ => config,
        })
    }

    pub fn qos(&self) -> Result<QoS, ConfigError> {
        Ok(qos_from_level(self.mqtt.qos)?)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.retention.max_messages, self.retention.max_age_days)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.discovery.debounce_ms)
    }

    pub fn rescan_interval(&self) -> Option<Duration> {
        match self.discovery.rescan_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

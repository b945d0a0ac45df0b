use crate::MqttError;
use std::time::Duration;

/// Configuration of an MQTT connection
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// MQTT host to connect to
    ///
    /// Default: "localhost"
    pub host: String,

    /// MQTT port to connect to.
    ///
    /// Default: 1883
    pub port: u16,

    /// The session name to be use on connect
    ///
    /// If no session name is provided, a random one will be created on connect,
    /// and the session will be clean on connect.
    ///
    /// Default: None
    pub session_name: Option<String>,

    /// Clean the MQTT session upon connect if set to `true`.
    ///
    /// Default: `false`.
    pub clean_session: bool,

    /// Keep alive interval
    ///
    /// Default: 60 seconds
    pub keep_alive: Duration,

    /// Capacity of the internal message queues
    ///
    /// Default: `1024`.
    pub queue_capacity: usize,

    /// Maximum size for a message payload
    ///
    /// Default: `1024 * 1024`.
    pub max_packet_size: usize,
}

/// By default a client connects the local MQTT broker.
impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::from("localhost"),
            port: 1883,
            session_name: None,
            clean_session: false,
            keep_alive: Duration::from_secs(60),
            queue_capacity: 1024,
            max_packet_size: 1024 * 1024,
        }
    }
}

impl Config {
    /// Build a config from a broker url such as `mqtt://broker:1883`
    ///
    /// The `mqtt` and `tcp` schemes are accepted; the port defaults to 1883.
    pub fn from_url(url: &str) -> Result<Self, MqttError> {
        let invalid = |reason: &str| MqttError::InvalidBrokerUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = url::Url::parse(url).map_err(|err| invalid(&err.to_string()))?;
        match parsed.scheme() {
            "mqtt" | "tcp" => {}
            scheme => return Err(invalid(&format!("unsupported scheme {scheme:?}"))),
        }
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid("missing host"))?;
        let port = parsed.port().unwrap_or(1883);

        Ok(Config::default().with_host(host).with_port(port))
    }

    /// Set a custom host
    pub fn with_host(self, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..self
        }
    }

    /// Set a custom port
    pub fn with_port(self, port: u16) -> Self {
        Self { port, ..self }
    }

    /// Set the session name
    pub fn with_session_name(self, name: impl Into<String>) -> Self {
        Self {
            session_name: Some(name.into()),
            ..self
        }
    }

    /// Set the clean_session flag
    pub fn with_clean_session(self, flag: bool) -> Self {
        Self {
            clean_session: flag,
            ..self
        }
    }

    /// Set the keep alive interval
    pub fn with_keep_alive(self, keep_alive: Duration) -> Self {
        Self { keep_alive, ..self }
    }

    /// Wrap this config into an internal set of options for `rumqttc`.
    pub(crate) fn mqtt_options(&self) -> rumqttc::MqttOptions {
        let id = match &self.session_name {
            None => std::iter::repeat_with(fastrand::lowercase)
                .take(10)
                .collect(),
            Some(name) => name.clone(),
        };

        let mut mqtt_options = rumqttc::MqttOptions::new(id, &self.host, self.port);

        if self.session_name.is_none() {
            // There is no point to have a session with a random name that will not be reused.
            mqtt_options.set_clean_session(true);
        } else {
            mqtt_options.set_clean_session(self.clean_session);
        }

        mqtt_options.set_keep_alive(self.keep_alive);
        mqtt_options.set_max_packet_size(self.max_packet_size, self.max_packet_size);

        mqtt_options
    }
}

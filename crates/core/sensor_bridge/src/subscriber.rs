use crate::SubscriptionRegistry;
use async_trait::async_trait;
use mqtt_channel::ClientHandle;
use mqtt_channel::MqttError;
use mqtt_channel::QoS;
use mqtt_channel::TopicFilter;
use sensor_api::list_sensor_dirs;
use sensor_api::load_sensor_config;
use sensor_api::topics::default_topic_filter;
use sensor_api::SensorDescriptor;
use std::path::Path;
use std::path::PathBuf;
use tokio::task::spawn_blocking;
use tokio::task::JoinError;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

/// Something that can subscribe to topic filters on behalf of the bridge
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Request a subscription, returning once the request has been accepted
    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), MqttError>;
}

#[async_trait]
impl Subscriber for ClientHandle {
    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), MqttError> {
        ClientHandle::subscribe(self, filter, qos).await
    }
}

/// The topic filters subscribed for a sensor, and those that failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionOutcome {
    pub subscribed: Vec<String>,
    pub failed: Vec<String>,
}

impl SubscriptionOutcome {
    /// A sensor is considered subscribed as soon as one of its filters is
    pub fn is_success(&self) -> bool {
        !self.subscribed.is_empty()
    }
}

/// Subscribes to the topics of the sensors found under the data root
pub struct SubscriptionManager<S> {
    subscriber: S,
    registry: SubscriptionRegistry,
    data_root: PathBuf,
    qos: QoS,
}

impl<S: Subscriber> SubscriptionManager<S> {
    pub fn new(
        subscriber: S,
        registry: SubscriptionRegistry,
        data_root: impl Into<PathBuf>,
        qos: QoS,
    ) -> Self {
        SubscriptionManager {
            subscriber,
            registry,
            data_root: data_root.into(),
            qos,
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Subscribe to the topics of a sensor
    ///
    /// When the descriptor declares no topics, `sensors/{TYPE}/{ID}/#` is used.
    /// A failure on one topic doesn't prevent the others from being subscribed.
    pub async fn subscribe_to_sensor(&self, descriptor: &SensorDescriptor) -> SubscriptionOutcome {
        let sensor_id = &descriptor.sensor_id;
        let filters = if descriptor.topics.is_empty() {
            vec![default_topic_filter(descriptor)]
        } else {
            descriptor.topics.clone()
        };

        let mut outcome = SubscriptionOutcome::default();
        for filter in filters {
            if let Err(err) = TopicFilter::new(&filter) {
                warn!("Cannot subscribe for sensor {sensor_id}: {err}");
                outcome.failed.push(filter);
                continue;
            }
            match self.subscriber.subscribe(&filter, self.qos).await {
                Ok(()) => {
                    info!("Subscribed to {filter} for sensor {sensor_id}");
                    outcome.subscribed.push(filter);
                }
                Err(err) => {
                    error!("Error subscribing to {filter} for sensor {sensor_id}: {err}");
                    outcome.failed.push(filter);
                }
            }
        }

        if outcome.is_success() {
            self.registry.insert(sensor_id);
        }
        outcome
    }

    /// Load the descriptor of a sensor and subscribe to its topics, unless already done
    ///
    /// Returns `None` if the sensor was already subscribed.
    pub async fn subscribe_if_new(
        &self,
        sensor_dir: &Path,
        sensor_id: &str,
    ) -> Option<SubscriptionOutcome> {
        if self.registry.contains(sensor_id) {
            return None;
        }

        let descriptor = match load_descriptor(sensor_dir, sensor_id).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                error!("Failed to load the descriptor of sensor {sensor_id}: {err}");
                return Some(SubscriptionOutcome::default());
            }
        };
        let outcome = self.subscribe_to_sensor(&descriptor).await;
        if outcome.is_success() {
            // The descriptor might name the sensor differently than its directory
            self.registry.insert(sensor_id);
        }
        Some(outcome)
    }

    /// Subscribe to the topics of all the sensors not subscribed yet
    ///
    /// Returns the number of newly subscribed sensors.
    pub async fn subscribe_to_all(&self) -> usize {
        let data_root = self.data_root.clone();
        let sensor_dirs = match spawn_blocking(move || list_sensor_dirs(&data_root)).await {
            Ok(Ok(sensor_dirs)) => sensor_dirs,
            Ok(Err(err)) => {
                error!("Cannot list the sensors of {:?}: {err}", self.data_root);
                return 0;
            }
            Err(err) => {
                error!("Failed to scan {:?}: {err}", self.data_root);
                return 0;
            }
        };
        debug!("Found {} sensor directories", sensor_dirs.len());

        let mut subscribed = 0;
        for (sensor_id, sensor_dir) in sensor_dirs {
            if let Some(outcome) = self.subscribe_if_new(&sensor_dir, &sensor_id).await {
                if outcome.is_success() {
                    subscribed += 1;
                }
            }
        }
        subscribed
    }

    /// Subscribe to all the sensors on a (re)connection
    ///
    /// A broker that has no session for the bridge has no subscriptions either.
    pub async fn on_connected(&self, session_present: bool) -> usize {
        if !session_present && !self.registry.is_empty() {
            info!("The MQTT session has been lost: subscribing again to all sensors");
            self.registry.clear();
        }
        self.subscribe_to_all().await
    }
}

/// Read a sensor descriptor out of the async runtime threads
async fn load_descriptor(
    sensor_dir: &Path,
    sensor_id: &str,
) -> Result<SensorDescriptor, JoinError> {
    let sensor_dir = sensor_dir.to_path_buf();
    let sensor_id = sensor_id.to_string();
    spawn_blocking(move || load_sensor_config(&sensor_dir, &sensor_id)).await
}

use crate::discovery::sensor_dir_id;
use crate::discovery::watch_sensor_dirs;
use crate::router::route;
use crate::router::DiscardReason;
use crate::router::Route;
use crate::writer::LogWriters;
use crate::BridgeConfig;
use crate::BridgeError;
use crate::Subscriber;
use crate::SubscriptionManager;
use crate::SubscriptionRegistry;
use clock::Clock;
use futures::Stream;
use futures::StreamExt;
use message_log::LogStore;
use mqtt_channel::Connection;
use mqtt_channel::ConnectionEvent;
use mqtt_channel::MqttMessage;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::spawn_blocking;
use tokio::time::interval_at;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

/// Run the bridge until a termination signal is received
pub async fn run(config: BridgeConfig, clock: Arc<dyn Clock>) -> Result<(), BridgeError> {
    info!("sensor-bridge starting");
    let mqtt_config = config.mqtt_config()?;
    let data_root = config.data.root.clone();
    if let Err(err) = std::fs::create_dir_all(&data_root) {
        warn!("Cannot create the data directory {data_root:?}: {err}");
    }

    let connection = Connection::connect(&mqtt_config);
    let client = connection.client.clone();

    let discovery = match watch_sensor_dirs(&data_root, config.debounce()) {
        Ok(candidates) => Some(candidates),
        Err(err) => {
            warn!("New sensors will only be detected by periodic scans: {err}");
            None
        }
    };

    let store = LogStore::new(&data_root, config.retention_policy(), clock.clone());
    let subscriptions = SubscriptionManager::new(
        client.clone(),
        SubscriptionRegistry::new(),
        data_root,
        config.qos()?,
    );
    let bridge = Bridge::new(subscriptions, store, clock, config.rescan_interval());

    let shutdown = async {
        if let Err(err) = bridge_utils::signals::interrupt().await {
            error!("Cannot listen to termination signals: {err}");
            std::future::pending::<()>().await
        }
    };
    bridge
        .run(connection.received, connection.events, discovery, shutdown)
        .await;

    info!("Disconnecting from MQTT broker");
    client.disconnect().await;
    Ok(())
}

/// Routes the messages received from the broker to the sensor logs,
/// subscribing to the topics of the sensors as they are found
pub struct Bridge<S> {
    subscriptions: SubscriptionManager<S>,
    writers: LogWriters,
    clock: Arc<dyn Clock>,
    rescan_interval: Option<Duration>,
}

impl<S: Subscriber> Bridge<S> {
    pub fn new(
        subscriptions: SubscriptionManager<S>,
        store: LogStore,
        clock: Arc<dyn Clock>,
        rescan_interval: Option<Duration>,
    ) -> Self {
        Bridge {
            subscriptions,
            writers: LogWriters::new(Arc::new(store)),
            clock,
            rescan_interval,
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        self.subscriptions.registry()
    }

    /// Process the inputs till the shutdown future completes or the messages stream ends
    ///
    /// The pending log writes are completed before returning.
    pub async fn run(
        mut self,
        mut messages: impl Stream<Item = MqttMessage> + Unpin,
        mut events: impl Stream<Item = ConnectionEvent> + Unpin,
        mut candidates: Option<mpsc::Receiver<PathBuf>>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        let mut rescan = self.rescan_interval.map(|period| {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticks
        });

        info!("Running");
        loop {
            tokio::select! {
                message = messages.next() => match message {
                    Some(message) => self.process_message(message),
                    None => {
                        info!("The MQTT connection has been closed");
                        break;
                    }
                },

                Some(event) = events.next() => self.process_event(event).await,

                Some(path) = next_candidate(&mut candidates) => self.process_candidate(path).await,

                _ = next_tick(&mut rescan) => {
                    let subscribed = self.subscriptions.subscribe_to_all().await;
                    if subscribed > 0 {
                        info!("Periodic scan: {subscribed} new sensors subscribed");
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
            }
        }

        self.writers.shutdown().await;
    }

    #[instrument(skip_all, fields(topic = %message.topic))]
    fn process_message(&mut self, message: MqttMessage) {
        match route(&message.topic.name, message.payload_bytes(), self.clock.now()) {
            Route::Routed(routed) => self.writers.dispatch(routed),
            Route::Discard(reason @ DiscardReason::RoomTopic { .. }) => {
                info!("Discarding message: {reason}")
            }
            Route::Discard(reason) => debug!("Discarding message: {reason}"),
        }
    }

    async fn process_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { session_present } => {
                let subscribed = self.subscriptions.on_connected(session_present).await;
                info!("Connected: {subscribed} sensors subscribed");
            }
            ConnectionEvent::SubscriptionRejected { pkid } => {
                error!("The MQTT broker rejected the subscription request {pkid}")
            }
            ConnectionEvent::Error(err) => warn!("MQTT connection error: {err}"),
            ConnectionEvent::Disconnected => info!("Disconnected from MQTT broker"),
        }
    }

    async fn process_candidate(&self, path: PathBuf) {
        let candidate = path.clone();
        let sensor_id = match spawn_blocking(move || sensor_dir_id(&candidate)).await {
            Ok(Some(sensor_id)) => sensor_id,
            Ok(None) => {
                debug!("Ignoring {path:?}: not a sensor directory");
                return;
            }
            Err(err) => {
                error!("Failed to check {path:?}: {err}");
                return;
            }
        };
        if let Some(outcome) = self.subscriptions.subscribe_if_new(&path, &sensor_id).await {
            info!(
                "New sensor directory detected: {sensor_id} ({} topics subscribed)",
                outcome.subscribed.len()
            );
        }
    }
}

async fn next_candidate(candidates: &mut Option<mpsc::Receiver<PathBuf>>) -> Option<PathBuf> {
    match candidates {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticks: &mut Option<Interval>) {
    match ticks {
        Some(ticks) => {
            ticks.tick().await;
        }
        None => std::future::pending().await,
    }
}

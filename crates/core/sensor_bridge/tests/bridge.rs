use async_trait::async_trait;
use clock::Clock;
use clock::WallClock;
use futures::channel::mpsc;
use futures::SinkExt;
use message_log::LogStore;
use message_log::RetentionPolicy;
use mqtt_channel::ConnectionEvent;
use mqtt_channel::MqttError;
use mqtt_channel::MqttMessage;
use mqtt_channel::QoS;
use mqtt_channel::Topic;
use pretty_assertions::assert_eq;
use sensor_bridge::Bridge;
use sensor_bridge::Subscriber;
use sensor_bridge::SubscriptionManager;
use sensor_bridge::SubscriptionRegistry;
use sensor_test_utils::TempSensorDir;
use serde_json::json;
use serde_json::Value;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct RecordingSubscriber {
    filters: Arc<Mutex<Vec<String>>>,
}

impl RecordingSubscriber {
    fn filters(&self) -> Vec<String> {
        self.filters.lock().unwrap().clone()
    }
}

#[async_trait]
impl Subscriber for RecordingSubscriber {
    async fn subscribe(&self, filter: &str, _qos: QoS) -> Result<(), MqttError> {
        self.filters.lock().unwrap().push(filter.to_string());
        Ok(())
    }
}

struct TestBridge {
    messages: mpsc::UnboundedSender<MqttMessage>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    candidates: tokio::sync::mpsc::Sender<PathBuf>,
    shutdown: oneshot::Sender<()>,
    subscriber: RecordingSubscriber,
    registry: SubscriptionRegistry,
    handle: JoinHandle<()>,
}

impl TestBridge {
    fn spawn(data_root: &Path) -> TestBridge {
        let subscriber = RecordingSubscriber::default();
        let registry = SubscriptionRegistry::new();
        let clock: Arc<dyn Clock> = Arc::new(WallClock::new());
        let subscriptions = SubscriptionManager::new(
            subscriber.clone(),
            registry.clone(),
            data_root,
            QoS::AtLeastOnce,
        );
        let store = LogStore::new(data_root, RetentionPolicy::default(), clock.clone());
        let bridge = Bridge::new(subscriptions, store, clock, None);

        let (messages, received) = mpsc::unbounded();
        let (events, connection_events) = mpsc::unbounded();
        let (candidates, candidate_receiver) = tokio::sync::mpsc::channel(16);
        let (shutdown, shutdown_receiver) = oneshot::channel();
        let handle = tokio::spawn(bridge.run(
            received,
            connection_events,
            Some(candidate_receiver),
            async move {
                let _ = shutdown_receiver.await;
            },
        ));

        TestBridge {
            messages,
            events,
            candidates,
            shutdown,
            subscriber,
            registry,
            handle,
        }
    }

    async fn publish(&mut self, topic: &str, payload: &str) {
        let message = MqttMessage::new(&Topic::new_unchecked(topic), payload);
        self.messages.send(message).await.unwrap();
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        tokio::time::timeout(TIMEOUT, self.handle)
            .await
            .unwrap()
            .unwrap();
    }
}

async fn eventually(condition: impl Fn() -> bool) {
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(TIMEOUT, wait)
        .await
        .expect("condition not met in time");
}

fn read_log(path: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn sensors_are_subscribed_on_connection() {
    let data_dir = TempSensorDir::new();
    data_dir.json_sensor("a1b2", "ESP32", "1", "101", &["Temperatur", "Helligkeit"]);
    data_dir.yaml_sensor("e5f6", &["sensors/DHT22/E5F6/#"]);
    let mut bridge = TestBridge::spawn(data_dir.path());

    bridge
        .events
        .send(ConnectionEvent::Connected {
            session_present: false,
        })
        .await
        .unwrap();
    let registry = bridge.registry.clone();
    eventually(|| registry.len() == 2).await;

    assert_eq!(
        bridge.subscriber.filters(),
        vec![
            "sensors/ESP32/A1B2/Temperatur",
            "sensors/ESP32/A1B2/Licht",
            "rooms/1/101/Temperatur",
            "rooms/1/101/Licht",
            "sensors/DHT22/E5F6/#",
        ]
    );
    bridge.stop().await;
}

#[tokio::test]
async fn sensor_messages_are_stored_in_the_sensor_logs() {
    let data_dir = TempSensorDir::new();
    data_dir.json_sensor("a1b2", "ESP32", "1", "101", &["Temperatur", "Helligkeit"]);
    let mut bridge = TestBridge::spawn(data_dir.path());

    bridge
        .publish("sensors/ESP32/A1B2/Temperatur", r#"{"dataValue": 21.4}"#)
        .await;
    bridge.publish("sensors/ESP32/A1B2/Licht", "512").await;
    bridge.publish("rooms/1/101/Temperatur", "21.4").await;
    bridge.publish("sensors/ESP32/A1B2/forceUpdate", "UPDATE").await;
    let messages_dir = data_dir.path().join("a1b2/messages");
    let temperature_log = messages_dir.join("Temperatur-messages.json");
    let light_log = messages_dir.join("Helligkeit-messages.json");
    eventually(|| temperature_log.exists() && light_log.exists()).await;
    bridge.stop().await;

    let temperatures = read_log(&temperature_log);
    assert_eq!(temperatures.len(), 1);
    assert_eq!(temperatures[0]["topic"], "sensors/ESP32/A1B2/Temperatur");
    assert_eq!(temperatures[0]["payload"], json!({"dataValue": 21.4}));

    let light = read_log(&light_log);
    assert_eq!(light.len(), 1);
    assert_eq!(light[0]["payload"], json!(512));

    let mut log_files: Vec<String> = std::fs::read_dir(&messages_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    log_files.sort();
    assert_eq!(
        log_files,
        vec!["Helligkeit-messages.json", "Temperatur-messages.json"]
    );
    assert!(!data_dir.path().join("1").exists());
}

#[tokio::test]
async fn discovered_sensors_are_subscribed_once() {
    let data_dir = TempSensorDir::new();
    let mut bridge = TestBridge::spawn(data_dir.path());

    let sensor_dir = data_dir.yaml_sensor("c3d4", &["sensors/SCD30/C3D4/CO2"]);
    bridge.candidates.send(sensor_dir.to_path_buf()).await.unwrap();
    bridge.candidates.send(sensor_dir.to_path_buf()).await.unwrap();
    bridge
        .candidates
        .send(data_dir.path().join("vanished"))
        .await
        .unwrap();
    let registry = bridge.registry.clone();
    eventually(|| registry.contains("c3d4")).await;

    // A reconnection with a session still present doesn't subscribe again
    bridge
        .events
        .send(ConnectionEvent::Connected {
            session_present: true,
        })
        .await
        .unwrap();
    bridge.publish("sensors/SCD30/C3D4/CO2", "415").await;
    let log = data_dir.path().join("c3d4/messages/CO2-messages.json");
    eventually(|| log.exists()).await;

    assert_eq!(bridge.subscriber.filters(), vec!["sensors/SCD30/C3D4/CO2"]);
    bridge.stop().await;
}

#[tokio::test]
async fn the_bridge_stops_when_the_connection_is_closed() {
    let data_dir = TempSensorDir::new();
    let mut bridge = TestBridge::spawn(data_dir.path());

    bridge.publish("sensors/ESP32/A1B2/Temperatur", "21").await;
    bridge.messages.close_channel();

    tokio::time::timeout(TIMEOUT, bridge.handle)
        .await
        .unwrap()
        .unwrap();
    let log = read_log(&data_dir.path().join("a1b2/messages/Temperatur-messages.json"));
    assert_eq!(log[0]["payload"], json!(21));
}

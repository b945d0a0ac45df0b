use crate::BridgeConfig;
use crate::BridgeError;
use futures::StreamExt;
use mqtt_channel::Connection;
use mqtt_channel::ConnectionEvent;
use mqtt_channel::MqttError;
use mqtt_channel::MqttMessage;
use mqtt_channel::QoS;
use sensor_api::topics::force_update_topic;
use sensor_api::topics::FORCE_UPDATE_PAYLOAD;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;
use tracing::warn;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// The request asking a sensor to publish its measurements now
pub fn force_update_request(
    sensor_type: &str,
    sensor_id: &str,
) -> Result<MqttMessage, MqttError> {
    let topic = force_update_topic(sensor_type, sensor_id)?;
    Ok(MqttMessage::new(&topic, FORCE_UPDATE_PAYLOAD).with_qos(QoS::AtLeastOnce))
}

/// Ask a sensor to publish its measurements now
pub async fn force_update(
    config: &BridgeConfig,
    sensor_type: &str,
    sensor_id: &str,
) -> Result<(), BridgeError> {
    let request = force_update_request(sensor_type, sensor_id)?;

    // A transient session, not to steal the session of a running bridge
    let mqtt_config = config.mqtt_config()?;
    let mqtt_config = mqtt_channel::Config {
        session_name: None,
        clean_session: true,
        ..mqtt_config
    };
    let mut connection = Connection::connect(&mqtt_config);

    wait_for(&mut connection, "the connection", |event| {
        matches!(event, ConnectionEvent::Connected { .. })
    })
    .await?;

    info!("Publishing {FORCE_UPDATE_PAYLOAD} on {}", request.topic);
    connection.client.publish(request).await?;
    connection.client.disconnect().await;

    wait_for(&mut connection, "the disconnection", |event| {
        matches!(event, ConnectionEvent::Disconnected)
    })
    .await
}

async fn wait_for(
    connection: &mut Connection,
    what: &'static str,
    expected: impl Fn(&ConnectionEvent) -> bool,
) -> Result<(), BridgeError> {
    let wait = async {
        while let Some(event) = connection.events.next().await {
            if expected(&event) {
                return Ok(());
            }
            if let ConnectionEvent::Error(err) = event {
                warn!("MQTT connection error: {err}");
            }
        }
        Err(BridgeError::ConnectionClosed(what))
    };
    timeout(CONNECTION_TIMEOUT, wait)
        .await
        .map_err(|_| BridgeError::Timeout(what))?
}

use crate::Config;
use crate::MqttError;
use crate::MqttMessage;
use crate::TopicFilter;
use futures::channel::mpsc;
use futures::SinkExt;
use rumqttc::AsyncClient;
use rumqttc::ConnectReturnCode;
use rumqttc::ConnectionError;
use rumqttc::Event;
use rumqttc::EventLoop;
use rumqttc::Incoming;
use rumqttc::Outgoing;
use rumqttc::Packet;
use rumqttc::QoS;
use rumqttc::SubscribeReasonCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::error;
use tracing::info;
use tracing::warn;

/// A change of the connection state, as notified by the broker
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConnectionEvent {
    /// The broker acknowledged a (re)connection.
    ///
    /// `session_present` is `false` when the broker holds no subscription for this client.
    Connected { session_present: bool },

    /// The broker rejected some subscriptions of the request `pkid`
    SubscriptionRejected { pkid: u16 },

    /// The connection failed; the event loop retries on its own
    Error(String),

    /// The connection has been closed
    Disconnected,
}

/// A connection to some MQTT server
pub struct Connection {
    /// The channel of the input messages received by this connection.
    pub received: mpsc::UnboundedReceiver<MqttMessage>,

    /// The channel of the connection state changes.
    pub events: mpsc::UnboundedReceiver<ConnectionEvent>,

    /// A handle to subscribe or publish while the connection is running.
    pub client: ClientHandle,
}

impl Connection {
    /// Open a connection to the broker
    ///
    /// The connection is established in the background:
    /// wait for a [ConnectionEvent::Connected] before issuing subscriptions.
    pub fn connect(config: &Config) -> Connection {
        let (received_sender, received_receiver) = mpsc::unbounded();
        let (event_sender, event_receiver) = mpsc::unbounded();

        let mqtt_options = config.mqtt_options();
        let (mqtt_client, event_loop) = AsyncClient::new(mqtt_options, config.queue_capacity);

        info!("Connecting to MQTT broker {}:{}", config.host, config.port);
        tokio::spawn(Connection::receiver_loop(
            event_loop,
            received_sender,
            event_sender,
        ));

        Connection {
            received: received_receiver,
            events: event_receiver,
            client: ClientHandle {
                client: mqtt_client,
            },
        }
    }

    async fn receiver_loop(
        mut event_loop: EventLoop,
        mut message_sender: mpsc::UnboundedSender<MqttMessage>,
        mut event_sender: mpsc::UnboundedSender<ConnectionEvent>,
    ) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    let event = if ack.code == ConnectReturnCode::Success {
                        info!("Connected to MQTT broker");
                        ConnectionEvent::Connected {
                            session_present: ack.session_present,
                        }
                    } else {
                        ConnectionEvent::Error(format!("connection refused: {:?}", ack.code))
                    };
                    let _ = event_sender.send(event).await;
                }

                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    if ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                    {
                        let event = ConnectionEvent::SubscriptionRejected { pkid: ack.pkid };
                        let _ = event_sender.send(event).await;
                    }
                }

                Ok(Event::Incoming(Packet::Publish(msg))) => {
                    let _ = message_sender.send(msg.into()).await;
                }

                Ok(Event::Incoming(Incoming::Disconnect))
                | Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    // The connection has been closed
                    break;
                }

                Err(err) => {
                    error!("MQTT connection error: {}", err);
                    let _ = event_sender
                        .send(ConnectionEvent::Error(err.to_string()))
                        .await;
                    Connection::pause_on_error(err).await;
                }
                _ => (),
            }
        }

        // No more messages will be forwarded to the client
        let _ = event_sender.send(ConnectionEvent::Disconnected).await;
        let _ = message_sender.close().await;
        let _ = event_sender.close().await;
    }

    async fn pause_on_error(err: ConnectionError) {
        let delay = match &err {
            ConnectionError::Io(_) => true,
            ConnectionError::MqttState(_) => true,
            ConnectionError::ConnectionRefused(_) => true,
            _ => false,
        };

        if delay {
            sleep(Duration::from_secs(1)).await;
        }
    }
}

/// A cloneable handle used to send requests on a running connection
///
/// The requests are queued in order with the disconnection request.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    client: AsyncClient,
}

impl ClientHandle {
    /// Request a subscription to a topic filter
    ///
    /// The filter is checked locally before being sent to the broker.
    /// A rejection by the broker is notified later as [ConnectionEvent::SubscriptionRejected].
    pub async fn subscribe(&self, pattern: &str, qos: QoS) -> Result<(), MqttError> {
        let filter = TopicFilter::new(pattern)?;
        for pattern in filter.patterns() {
            self.client.subscribe(pattern.as_str(), qos).await?;
        }
        Ok(())
    }

    /// Publish a message, after the pending requests
    pub async fn publish(&self, message: MqttMessage) -> Result<(), MqttError> {
        let payload = Vec::from(message.payload_bytes());
        self.client
            .publish(message.topic, message.qos, message.retain, payload)
            .await?;
        Ok(())
    }

    /// Close the connection, after the pending requests
    pub async fn disconnect(&self) {
        if let Err(err) = self.client.disconnect().await {
            warn!("Fail to disconnect from the MQTT broker: {}", err);
        }
    }
}

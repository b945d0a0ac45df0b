//! A library to connect an MQTT broker, receive the messages of dynamic subscriptions
//! and publish messages.
//!
//! ```no_run
//! use mqtt_channel::{Config, Connection, ConnectionEvent, MqttError, QoS, StreamExt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MqttError> {
//!     let config = Config::from_url("mqtt://localhost:1883")?.with_session_name("demo");
//!     let mut con = Connection::connect(&config);
//!
//!     // Subscriptions are issued once the broker has acknowledged the connection
//!     if let Some(ConnectionEvent::Connected { .. }) = con.events.next().await {
//!         con.client.subscribe("sensors/+/+/#", QoS::AtLeastOnce).await?;
//!     }
//!
//!     // Messages are received from the subscriptions on the received channel
//!     let message = con.received.next().await.ok_or(MqttError::ReadOnClosedConnection)?;
//!     println!("{}", String::from_utf8_lossy(message.payload_bytes()));
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

mod config;
mod connection;
mod errors;
mod messages;
mod topics;

pub use config::*;
pub use connection::*;
pub use errors::*;
pub use messages::*;
pub use topics::*;

pub use futures::StreamExt;

pub use rumqttc::QoS;

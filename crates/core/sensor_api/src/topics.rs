use crate::descriptor::SensorDescriptor;
use crate::error::DescriptorError;
use crate::measurement;
use mqtt_channel::MqttError;
use mqtt_channel::Topic;
use std::str::FromStr;

pub const SENSORS_ROOT: &str = "sensors";
pub const ROOMS_ROOT: &str = "rooms";
pub const FORCE_UPDATE: &str = "forceUpdate";
pub const FORCE_UPDATE_PAYLOAD: &str = "UPDATE";

/// Derive the topics published by a sensor from its descriptor
///
/// For each measurement, in order, `sensors/{TYPE}/{ID}/{measurement}`,
/// then for each measurement `rooms/{FLOOR}/{ROOM}/{measurement}`.
///
/// ```
/// use sensor_api::topics::derive_topics;
/// use sensor_api::SensorDescriptor;
///
/// let descriptor = SensorDescriptor::new("a1b2")
///     .with_sensor_type("ESP32")
///     .with_location("1", "101")
///     .with_measurements(&["Temperatur", "Helligkeit"]);
///
/// assert_eq!(
///     derive_topics(&descriptor).unwrap(),
///     vec![
///         "sensors/ESP32/A1B2/Temperatur",
///         "sensors/ESP32/A1B2/Licht",
///         "rooms/1/101/Temperatur",
///         "rooms/1/101/Licht",
///     ]
/// );
/// ```
pub fn derive_topics(descriptor: &SensorDescriptor) -> Result<Vec<String>, DescriptorError> {
    let sensor_type = descriptor
        .sensor_type
        .as_ref()
        .ok_or_else(|| DescriptorError::MissingSensorType {
            sensor_id: descriptor.sensor_id.clone(),
        })?
        .to_uppercase();
    let location =
        descriptor
            .location
            .as_ref()
            .ok_or_else(|| DescriptorError::MissingLocation {
                sensor_id: descriptor.sensor_id.clone(),
            })?;
    let sensor_id = descriptor.sensor_id.to_uppercase();
    let floor = location.floor.to_uppercase();
    let room = location.room.to_uppercase();

    let measurements = descriptor
        .measurement_types
        .iter()
        .map(|m| measurement::topic_name(m));
    let sensor_topics = measurements
        .clone()
        .map(|m| format!("{SENSORS_ROOT}/{sensor_type}/{sensor_id}/{m}"));
    let room_topics = measurements.map(|m| format!("{ROOMS_ROOT}/{floor}/{room}/{m}"));

    Ok(sensor_topics.chain(room_topics).collect())
}

/// The topic filter used for a sensor which descriptor declares no topics
///
/// Without a sensor type, the sensor id is used as is in place of the type.
pub fn default_topic_filter(descriptor: &SensorDescriptor) -> String {
    let sensor_type = match &descriptor.sensor_type {
        Some(sensor_type) => sensor_type.to_uppercase(),
        None => descriptor.sensor_id.clone(),
    };
    let sensor_id = descriptor.sensor_id.to_uppercase();
    format!("{SENSORS_ROOT}/{sensor_type}/{sensor_id}/#")
}

/// The topic filter used for a sensor with no usable descriptor
pub fn fallback_topic_filter(sensor_id: &str) -> String {
    format!("{SENSORS_ROOT}/{sensor_id}/#")
}

/// The topic on which a sensor listens for requests to publish its measurements
///
/// Fails if the sensor type or id contains an MQTT wildcard.
pub fn force_update_topic(sensor_type: &str, sensor_id: &str) -> Result<Topic, MqttError> {
    Topic::new(&format!(
        "{SENSORS_ROOT}/{}/{}/{FORCE_UPDATE}",
        sensor_type.to_uppercase(),
        sensor_id.to_uppercase()
    ))
}

/// The meaning of a topic on which sensors publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorTopic {
    /// `sensors/{type}/{id}/{measurement}`
    Measurement {
        sensor_type: String,
        sensor_id: String,
        measurement: String,
    },

    /// `sensors/{type}/{id}/forceUpdate`
    ForceUpdate {
        sensor_type: String,
        sensor_id: String,
    },

    /// `rooms/{floor}/{room}/{measurement}`
    Room {
        floor: String,
        room: String,
        measurement: String,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum SensorTopicError {
    #[error("Unknown topic root in {0:?}")]
    UnknownRoot(String),

    #[error("Missing or empty topic segments in {0:?}")]
    MissingSegment(String),
}

impl FromStr for SensorTopic {
    type Err = SensorTopicError;

    /// Segments after the measurement are ignored
    fn from_str(topic: &str) -> Result<Self, SensorTopicError> {
        let missing_segment = || SensorTopicError::MissingSegment(topic.to_string());
        match topic.split('/').collect::<Vec<&str>>()[..] {
            [SENSORS_ROOT, sensor_type, sensor_id, measurement, ..] => {
                if [sensor_type, sensor_id, measurement]
                    .iter()
                    .any(|segment| segment.is_empty())
                {
                    return Err(missing_segment());
                }
                if measurement == FORCE_UPDATE {
                    Ok(SensorTopic::ForceUpdate {
                        sensor_type: sensor_type.to_string(),
                        sensor_id: sensor_id.to_string(),
                    })
                } else {
                    Ok(SensorTopic::Measurement {
                        sensor_type: sensor_type.to_string(),
                        sensor_id: sensor_id.to_string(),
                        measurement: measurement.to_string(),
                    })
                }
            }
            [ROOMS_ROOT, floor, room, measurement, ..] => Ok(SensorTopic::Room {
                floor: floor.to_string(),
                room: room.to_string(),
                measurement: measurement.to_string(),
            }),
            [SENSORS_ROOT, ..] | [ROOMS_ROOT, ..] => Err(missing_segment()),
            _ => Err(SensorTopicError::UnknownRoot(topic.to_string())),
        }
    }
}

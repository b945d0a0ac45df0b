use sensor_api::measurement;
use sensor_api::topics::SensorTopicError;
use sensor_api::LogEntry;
use sensor_api::SensorTopic;
use std::fmt::Display;
use std::fmt::Formatter;
use time::OffsetDateTime;

/// Where a message received from the broker has to go
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// To the log of a sensor measurement
    Routed(RoutedMessage),

    /// Nowhere
    Discard(DiscardReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedMessage {
    /// Lower-cased, as the sensor directories
    pub sensor_id: String,
    /// As used in the log file name
    pub measurement: String,
    pub entry: LogEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Room messages are not related to a specific sensor
    RoomTopic { floor: String, room: String },

    /// Requests sent to the sensors
    ForceUpdate,

    Unroutable(SensorTopicError),
}

impl Display for DiscardReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscardReason::RoomTopic { floor, room } => {
                write!(f, "room topic (floor {floor}, room {room})")
            }
            DiscardReason::ForceUpdate => write!(f, "force update request"),
            DiscardReason::Unroutable(err) => write!(f, "{err}"),
        }
    }
}

/// Route a message received at some time on a topic
///
/// ```
/// use sensor_bridge::router::{route, Route};
/// use time::OffsetDateTime;
///
/// let received_at = OffsetDateTime::now_utc();
/// let Route::Routed(message) = route("sensors/ESP32/A1B2/Licht", b"512", received_at) else {
///     panic!("a sensor measurement is routed")
/// };
/// assert_eq!(message.sensor_id, "a1b2");
/// assert_eq!(message.measurement, "Helligkeit");
/// ```
pub fn route(topic: &str, payload: &[u8], received_at: OffsetDateTime) -> Route {
    match topic.parse::<SensorTopic>() {
        Ok(SensorTopic::Measurement {
            sensor_id,
            measurement,
            ..
        }) => Route::Routed(RoutedMessage {
            sensor_id: sensor_id.to_lowercase(),
            measurement: measurement::file_name(&measurement).to_string(),
            entry: LogEntry::new(received_at, topic, payload),
        }),
        Ok(SensorTopic::ForceUpdate { .. }) => Route::Discard(DiscardReason::ForceUpdate),
        Ok(SensorTopic::Room { floor, room, .. }) => {
            Route::Discard(DiscardReason::RoomTopic { floor, room })
        }
        Err(err) => Route::Discard(DiscardReason::Unroutable(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;
    use time::macros::datetime;

    #[test]
    fn sensor_measurements_are_routed_to_the_sensor_log() {
        let received_at = datetime!(2024-05-17 14:03:59 +2);

        let route = route(
            "sensors/ESP32/A1B2/Temperatur",
            br#"{"dataValue": 21.4}"#,
            received_at,
        );

        assert_eq!(
            route,
            Route::Routed(RoutedMessage {
                sensor_id: "a1b2".to_string(),
                measurement: "Temperatur".to_string(),
                entry: LogEntry {
                    timestamp: "2024-05-17 @ 14:03:59".to_string(),
                    topic: "sensors/ESP32/A1B2/Temperatur".to_string(),
                    payload: json!({"dataValue": 21.4}),
                },
            })
        );
    }

    #[test_case("sensors/ESP32/A1B2/Licht", "Helligkeit" ; "light is stored as Helligkeit")]
    #[test_case("sensors/ESP32/A1B2/Helligkeit", "Helligkeit" ; "Helligkeit is kept")]
    #[test_case("sensors/SCD30/C3D4/CO2", "CO2" ; "other measurements are kept")]
    fn measurement_file_names(topic: &str, expected: &str) {
        let route = route(topic, b"1", OffsetDateTime::now_utc());
        assert_matches!(
            route,
            Route::Routed(RoutedMessage { measurement, .. }) if measurement == expected
        );
    }

    #[test]
    fn text_payloads_are_stored_as_strings() {
        let route = route("sensors/ESP32/A1B2/Status", b"online", OffsetDateTime::now_utc());
        assert_matches!(
            route,
            Route::Routed(RoutedMessage { entry, .. }) if entry.payload == json!("online")
        );
    }

    #[test]
    fn room_messages_are_discarded() {
        assert_eq!(
            route("rooms/1/101/Temperatur", b"21.4", OffsetDateTime::now_utc()),
            Route::Discard(DiscardReason::RoomTopic {
                floor: "1".to_string(),
                room: "101".to_string()
            })
        );
    }

    #[test]
    fn force_update_requests_are_discarded() {
        assert_eq!(
            route(
                "sensors/ESP32/A1B2/forceUpdate",
                b"UPDATE",
                OffsetDateTime::now_utc()
            ),
            Route::Discard(DiscardReason::ForceUpdate)
        );
    }

    #[test_case("sensors/ESP32/A1B2" ; "missing measurement")]
    #[test_case("sensors/ESP32//Temperatur" ; "empty sensor id")]
    #[test_case("alerts/A1B2" ; "unknown root")]
    fn unroutable_messages_are_discarded(topic: &str) {
        assert_matches!(
            route(topic, b"{}", OffsetDateTime::now_utc()),
            Route::Discard(DiscardReason::Unroutable(_))
        );
    }
}

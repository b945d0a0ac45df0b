use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::macros::format_description;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;

/// A message received from a sensor, as stored in a message log
///
/// ```json
/// {
///   "timestamp": "2024-05-17 @ 14:03:59",
///   "topic": "sensors/ESP32/A1B2/Temperatur",
///   "payload": { "dataValue": 21.4 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub topic: String,
    pub payload: Value,
}

impl LogEntry {
    pub fn new(received_at: OffsetDateTime, topic: impl Into<String>, payload: &[u8]) -> Self {
        LogEntry {
            timestamp: format_timestamp(received_at),
            topic: topic.into(),
            payload: parse_payload(payload),
        }
    }
}

/// Format a date as `YYYY-MM-DD @ HH:MM:SS`, ignoring its offset
pub fn format_timestamp(date: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} @ {:02}:{:02}:{:02}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second()
    )
}

/// Parse a `YYYY-MM-DD @ HH:MM:SS` timestamp, taken as a time at the given offset
pub fn parse_timestamp(timestamp: &str, offset: UtcOffset) -> Option<OffsetDateTime> {
    let format = format_description!("[year]-[month]-[day] @ [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(timestamp, format)
        .ok()
        .map(|date| date.assume_offset(offset))
}

/// The payload as JSON, or as a string when not JSON
pub fn parse_payload(payload: &[u8]) -> Value {
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
}

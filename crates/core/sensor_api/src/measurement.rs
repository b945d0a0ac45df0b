//! The light measurement has two names.
//!
//! Sensors publish it as `Licht`, while the dashboard lists it as `Helligkeit`
//! and reads it from `Helligkeit-messages.json`.

pub const LIGHT_TOPIC_NAME: &str = "Licht";
pub const LIGHT_FILE_NAME: &str = "Helligkeit";

/// The name of a measurement as used in a topic
pub fn topic_name(measurement: &str) -> &str {
    if measurement == LIGHT_FILE_NAME {
        LIGHT_TOPIC_NAME
    } else {
        measurement
    }
}

/// The name of a measurement as used in a message log file name
pub fn file_name(measurement: &str) -> &str {
    if measurement == LIGHT_TOPIC_NAME {
        LIGHT_FILE_NAME
    } else {
        measurement
    }
}

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

/// Identity and metadata of a sensor, as found in `<data-root>/<id>/<id>.{json,yaml}`
///
/// The field names follow the files written by the dashboard (`sensorTyp`, `sensorData`, ...),
/// the more regular spellings (`sensorType`, `measurementTypes`, ...) being accepted too.
/// Any other key, such as the dashboard `configurations`, is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    #[serde(rename = "sensorID", alias = "sensorId", default)]
    pub sensor_id: String,

    #[serde(
        rename = "sensorTyp",
        alias = "sensorType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sensor_type: Option<String>,

    #[serde(
        rename = "sensorName",
        alias = "name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,

    #[serde(
        rename = "sensorDescription",
        alias = "description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(rename = "sensorData", alias = "measurementTypes", default)]
    pub measurement_types: Vec<String>,

    /// The topic filters to subscribe to for this sensor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "string_or_number")]
    pub room: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub floor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SensorDescriptor {
    /// A descriptor with no metadata nor topics
    pub fn new(sensor_id: impl Into<String>) -> Self {
        SensorDescriptor {
            sensor_id: sensor_id.into(),
            ..Default::default()
        }
    }

    pub fn with_sensor_type(self, sensor_type: impl Into<String>) -> Self {
        SensorDescriptor {
            sensor_type: Some(sensor_type.into()),
            ..self
        }
    }

    pub fn with_location(self, floor: impl Into<String>, room: impl Into<String>) -> Self {
        SensorDescriptor {
            location: Some(Location {
                room: room.into(),
                floor: floor.into(),
                description: None,
            }),
            ..self
        }
    }

    pub fn with_measurements(self, measurements: &[&str]) -> Self {
        SensorDescriptor {
            measurement_types: measurements.iter().map(|m| m.to_string()).collect(),
            ..self
        }
    }

    pub fn with_topics(self, topics: Vec<String>) -> Self {
        SensorDescriptor { topics, ..self }
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// Floors and rooms are sometimes entered as numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Integer(number) => number.to_string(),
        Scalar::Float(number) => number.to_string(),
    })
}

use crate::descriptor::SensorDescriptor;
use crate::error::DescriptorError;
use crate::topics::derive_topics;
use crate::topics::fallback_topic_filter;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

const CONFIGURATIONS_DIR: &str = "configurations";
const CONFIGURATION_SUFFIX: &str = "-config.json";

/// Load the descriptor of the sensor stored in `sensor_dir`
///
/// The first of these sources that can be read wins:
/// - `<sensor_dir>/<sensor_id>.json`, the topics being derived from the measurements and location
/// - `<sensor_dir>/<sensor_id>.yaml`, the topics being those declared by the file
/// - the `topic` fields of `<sensor_dir>/configurations/*-config.json`
///
/// When none applies, the descriptor subscribes to `sensors/<sensor_id>/#`.
pub fn load_sensor_config(sensor_dir: &Path, sensor_id: &str) -> SensorDescriptor {
    let json_path = sensor_dir.join(format!("{sensor_id}.json"));
    if json_path.exists() {
        match load_json_descriptor(&json_path) {
            Ok(descriptor) => return with_sensor_id(descriptor, sensor_id),
            Err(err) => warn!("Ignoring the descriptor of sensor {sensor_id}: {err}"),
        }
    }

    let yaml_path = sensor_dir.join(format!("{sensor_id}.yaml"));
    if yaml_path.exists() {
        match load_yaml_descriptor(&yaml_path) {
            Ok(descriptor) => return with_sensor_id(descriptor, sensor_id),
            Err(err) => warn!("Ignoring the descriptor of sensor {sensor_id}: {err}"),
        }
    }

    let topics = load_configuration_topics(&sensor_dir.join(CONFIGURATIONS_DIR));
    if topics.is_empty() {
        debug!("No descriptor found for sensor {sensor_id}");
        SensorDescriptor::new(sensor_id).with_topics(vec![fallback_topic_filter(sensor_id)])
    } else {
        SensorDescriptor::new(sensor_id).with_topics(topics)
    }
}

fn load_json_descriptor(path: &Path) -> Result<SensorDescriptor, DescriptorError> {
    let content = read_file(path)?;
    let descriptor =
        SensorDescriptor::from_json(&content).map_err(|source| DescriptorError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
    let topics = derive_topics(&descriptor)?;
    Ok(descriptor.with_topics(topics))
}

fn load_yaml_descriptor(path: &Path) -> Result<SensorDescriptor, DescriptorError> {
    let content = read_file(path)?;
    SensorDescriptor::from_yaml(&content).map_err(|source| DescriptorError::InvalidYaml {
        path: path.to_path_buf(),
        source,
    })
}

/// A descriptor that doesn't tell its id is given the name of its directory
fn with_sensor_id(mut descriptor: SensorDescriptor, sensor_id: &str) -> SensorDescriptor {
    if descriptor.sensor_id.is_empty() {
        descriptor.sensor_id = sensor_id.to_string();
    }
    descriptor
}

#[derive(Deserialize)]
struct MeasurementConfig {
    topic: Option<String>,
}

/// The topics listed by the measurement configurations, sorted by file name
fn load_configuration_topics(config_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(config_dir) else {
        return vec![];
    };

    let mut config_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(CONFIGURATION_SUFFIX))
        })
        .collect();
    config_files.sort();

    let mut topics: Vec<String> = vec![];
    for path in config_files {
        let config = read_file(&path).and_then(|content| {
            serde_json::from_str::<MeasurementConfig>(&content).map_err(|source| {
                DescriptorError::InvalidJson {
                    path: path.clone(),
                    source,
                }
            })
        });
        match config {
            Ok(MeasurementConfig { topic: Some(topic) }) if !topic.is_empty() => {
                if !topics.contains(&topic) {
                    topics.push(topic);
                }
            }
            Ok(_) => {}
            Err(err) => warn!("Ignoring measurement configuration: {err}"),
        }
    }
    topics
}

fn read_file(path: &Path) -> Result<String, DescriptorError> {
    std::fs::read_to_string(path).map_err(|source| DescriptorError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// List the sensor directories of the data root, sorted by sensor id
///
/// Hidden entries and entries which names are not valid UTF-8 are skipped.
pub fn list_sensor_dirs(data_root: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut sensor_dirs = vec![];
    for entry in std::fs::read_dir(data_root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Cannot read an entry of {data_root:?}: {err}");
                continue;
            }
        };
        let path = entry.path();
        let Some(sensor_id) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Ignoring {path:?}: not a valid sensor id");
            continue;
        };
        if sensor_id.starts_with('.') || !path.is_dir() {
            continue;
        }
        sensor_dirs.push((sensor_id, path));
    }
    sensor_dirs.sort();
    Ok(sensor_dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sensor_test_utils::TempSensorDir;

    #[test]
    fn json_descriptors_get_derived_topics() {
        let data_dir = TempSensorDir::new();
        let sensor_dir =
            data_dir.json_sensor("a1b2", "ESP32", "1", "101", &["Temperatur", "Helligkeit"]);

        let descriptor = load_sensor_config(sensor_dir.path(), "a1b2");

        assert_eq!(descriptor.sensor_id, "a1b2");
        assert_eq!(descriptor.sensor_type.as_deref(), Some("ESP32"));
        assert_eq!(
            descriptor.topics,
            vec![
                "sensors/ESP32/A1B2/Temperatur",
                "sensors/ESP32/A1B2/Licht",
                "rooms/1/101/Temperatur",
                "rooms/1/101/Licht",
            ]
        );
        assert_eq!(descriptor.measurement_types, vec!["Temperatur", "Helligkeit"]);
    }

    #[test]
    fn yaml_descriptors_keep_their_topics() {
        let data_dir = TempSensorDir::new();
        let sensor_dir = data_dir.yaml_sensor("e5f6", &["sensors/DHT22/E5F6/Temperatur"]);

        let descriptor = load_sensor_config(sensor_dir.path(), "e5f6");

        assert_eq!(descriptor.topics, vec!["sensors/DHT22/E5F6/Temperatur"]);
    }

    #[test]
    fn yaml_descriptors_without_topics_are_not_derived() {
        let data_dir = TempSensorDir::new();
        let sensor_dir = data_dir.dir("e5f6");
        sensor_dir.file("e5f6.yaml").with_raw_content(
            "sensorType: DHT22\nlocation:\n  floor: 2\n  room: 204\nsensorData: [Temperatur]\n",
        );

        let descriptor = load_sensor_config(sensor_dir.path(), "e5f6");

        assert_eq!(descriptor.sensor_id, "e5f6");
        assert!(descriptor.topics.is_empty());
    }

    #[test]
    fn an_incomplete_json_descriptor_falls_through_to_yaml() {
        let data_dir = TempSensorDir::new();
        let sensor_dir = data_dir.yaml_sensor("a1b2", &["sensors/ESP32/A1B2/CO2"]);
        sensor_dir
            .file("a1b2.json")
            .with_raw_content(r#"{"sensorID": "a1b2", "sensorData": ["CO2"]}"#);

        let descriptor = load_sensor_config(sensor_dir.path(), "a1b2");

        assert_eq!(descriptor.topics, vec!["sensors/ESP32/A1B2/CO2"]);
    }

    #[test]
    fn invalid_descriptors_fall_through_to_measurement_configurations() {
        let data_dir = TempSensorDir::new();
        let sensor_dir = data_dir.dir("c3d4");
        sensor_dir.file("c3d4.json").with_raw_content("{ not json");
        sensor_dir.file("c3d4.yaml").with_raw_content("topics: [unclosed");
        sensor_dir.measurement_config("Temperatur", "sensors/SCD30/C3D4/Temperatur");
        sensor_dir.measurement_config("CO2", "sensors/SCD30/C3D4/CO2");
        sensor_dir
            .dir("configurations")
            .file("notes.txt")
            .with_raw_content("{\"topic\": \"ignored\"}");
        sensor_dir
            .dir("configurations")
            .file("broken-config.json")
            .with_raw_content("[");

        let descriptor = load_sensor_config(sensor_dir.path(), "c3d4");

        assert_eq!(
            descriptor.topics,
            vec!["sensors/SCD30/C3D4/CO2", "sensors/SCD30/C3D4/Temperatur"]
        );
    }

    #[test]
    fn a_sensor_without_descriptor_subscribes_to_a_wildcard() {
        let data_dir = TempSensorDir::new();
        let sensor_dir = data_dir.dir("g7h8");

        let descriptor = load_sensor_config(sensor_dir.path(), "g7h8");

        assert_eq!(
            descriptor,
            SensorDescriptor::new("g7h8").with_topics(vec!["sensors/g7h8/#".to_string()])
        );
    }

    #[test]
    fn list_sensor_directories() {
        let data_dir = TempSensorDir::new();
        data_dir.dir("c3d4");
        data_dir.dir("a1b2");
        data_dir.dir(".trash");
        data_dir.file("README.md");

        let sensor_dirs = list_sensor_dirs(data_dir.path()).unwrap();

        assert_eq!(
            sensor_dirs,
            vec![
                ("a1b2".to_string(), data_dir.path().join("a1b2")),
                ("c3d4".to_string(), data_dir.path().join("c3d4")),
            ]
        );
    }

    #[test]
    fn listing_a_missing_data_root_is_an_error() {
        let data_dir = TempSensorDir::new();
        assert!(list_sensor_dirs(&data_dir.path().join("missing")).is_err());
    }
}

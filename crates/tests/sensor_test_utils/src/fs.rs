use serde_json::json;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary directory tree, removed when the last clone is dropped
#[derive(Debug, Clone)]
pub struct TempSensorDir {
    pub temp_dir: Arc<TempDir>,
    current_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TempSensorFile {
    pub file_path: PathBuf,
}

impl Default for TempSensorDir {
    fn default() -> Self {
        let temp_dir = if let Ok(dir) = std::env::var("TEMP_DIR_ROOT") {
            TempDir::new_in(dir).unwrap()
        } else {
            TempDir::new().unwrap()
        };
        let current_path = temp_dir.path().to_path_buf();
        TempSensorDir {
            temp_dir: Arc::new(temp_dir),
            current_path,
        }
    }
}

impl TempSensorDir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(&self, directory_name: &str) -> TempSensorDir {
        let path = self.current_path.join(directory_name);

        if !path.exists() {
            fs::create_dir(&path).unwrap();
        };

        TempSensorDir {
            temp_dir: self.temp_dir.clone(),
            current_path: path,
        }
    }

    pub fn file(&self, file_name: &str) -> TempSensorFile {
        let path = self.current_path.join(file_name);

        if !path.exists() {
            let file = fs::File::create(&path).unwrap();
            file.sync_all().unwrap();
        };
        TempSensorFile { file_path: path }
    }

    /// Create the directory of a sensor with a JSON descriptor as written by the dashboard
    pub fn json_sensor(
        &self,
        sensor_id: &str,
        sensor_type: &str,
        floor: &str,
        room: &str,
        measurements: &[&str],
    ) -> TempSensorDir {
        let sensor_dir = self.dir(sensor_id);
        let descriptor = json!({
            "sensorID": sensor_id,
            "sensorTyp": sensor_type,
            "sensorName": format!("{sensor_type} {sensor_id}"),
            "sensorDescription": "",
            "location": {
                "room": room,
                "floor": floor,
                "description": "",
            },
            "sensorData": measurements,
            "configurations": [],
        });
        sensor_dir
            .file(&format!("{sensor_id}.json"))
            .with_json_content(descriptor);
        sensor_dir
    }

    /// Create the directory of a sensor with a YAML descriptor declaring its topics
    pub fn yaml_sensor(&self, sensor_id: &str, topics: &[&str]) -> TempSensorDir {
        let sensor_dir = self.dir(sensor_id);
        let mut content = format!("sensorID: {sensor_id}\ntopics:\n");
        for topic in topics {
            content.push_str(&format!("  - \"{topic}\"\n"));
        }
        sensor_dir
            .file(&format!("{sensor_id}.yaml"))
            .with_raw_content(&content);
        sensor_dir
    }

    /// Add a per-measurement configuration file to a sensor directory
    pub fn measurement_config(&self, measurement: &str, topic: &str) -> TempSensorFile {
        self.dir("configurations")
            .file(&format!("{measurement}-config.json"))
            .with_json_content(json!({ "type": measurement, "topic": topic }))
    }

    pub fn path(&self) -> &Path {
        self.current_path.as_path()
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.current_path.clone()
    }
}

impl TempSensorFile {
    pub fn with_raw_content(self, content: &str) -> Self {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(false)
            .open(self.file_path.clone())
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file.sync_all().unwrap();
        self
    }

    pub fn with_json_content(self, content: serde_json::Value) -> Self {
        let content = serde_json::to_string_pretty(&content).unwrap();
        self.with_raw_content(&content)
    }

    pub fn delete(self) {
        std::fs::remove_file(self.path()).unwrap();
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.file_path)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::TempSensorDir;
    use std::path::Path;

    #[test]
    fn assert_dir_file_and_content() -> Result<(), anyhow::Error> {
        let data_dir = TempSensorDir::new();
        data_dir.dir("a1b2").dir("messages");
        data_dir
            .dir("a1b2")
            .file("a1b2.yaml")
            .with_raw_content("sensorID: a1b2");

        assert!(Path::new(&format!("{}/a1b2/messages", data_dir.path().display())).exists());
        assert_eq!(
            std::fs::read_to_string(data_dir.path().join("a1b2/a1b2.yaml"))?,
            "sensorID: a1b2"
        );
        Ok(())
    }

    #[test]
    fn json_sensor_writes_a_dashboard_descriptor() -> Result<(), anyhow::Error> {
        let data_dir = TempSensorDir::new();
        let sensor_dir = data_dir.json_sensor("a1b2", "ESP32", "1", "101", &["Temperatur"]);

        let content = std::fs::read_to_string(sensor_dir.path().join("a1b2.json"))?;
        let descriptor: serde_json::Value = serde_json::from_str(&content)?;
        assert_eq!(descriptor["sensorTyp"], "ESP32");
        assert_eq!(descriptor["location"]["room"], "101");
        assert_eq!(descriptor["sensorData"][0], "Temperatur");
        Ok(())
    }

    #[test]
    fn measurement_config_lands_in_the_configurations_dir() {
        let data_dir = TempSensorDir::new();
        let sensor_dir = data_dir.dir("c3d4");
        sensor_dir.measurement_config("CO2", "sensors/SCD30/C3D4/CO2");

        assert!(sensor_dir
            .path()
            .join("configurations/CO2-config.json")
            .exists());
    }
}

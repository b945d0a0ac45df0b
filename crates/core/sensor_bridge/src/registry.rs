use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

/// The set of sensors whose topics have been subscribed
///
/// Sensor ids are compared case-insensitively.
/// Clones share the same set.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionRegistry {
    sensors: Arc<Mutex<HashSet<String>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sensor as subscribed
    ///
    /// Returns `false` if the sensor was already recorded.
    pub fn insert(&self, sensor_id: &str) -> bool {
        self.lock().insert(sensor_id.to_lowercase())
    }

    pub fn contains(&self, sensor_id: &str) -> bool {
        self.lock().contains(&sensor_id.to_lowercase())
    }

    /// Forget all the sensors, as when the broker lost the session
    pub fn clear(&self) {
        self.lock().clear()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The recorded sensor ids, sorted
    pub fn sensor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().iter().cloned().collect();
        ids.sort();
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.sensors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

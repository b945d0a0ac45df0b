use crate::router::RoutedMessage;
use message_log::LogStore;
use sensor_api::LogEntry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::error;

type LogKey = (String, String);

/// Write the routed messages to the message logs
///
/// Each log has its own writer task, created on the first message,
/// so the messages of one log are written in order
/// while the messages of different logs are written concurrently.
pub struct LogWriters {
    store: Arc<LogStore>,
    queues: HashMap<LogKey, mpsc::UnboundedSender<LogEntry>>,
    tasks: JoinSet<()>,
}

impl LogWriters {
    pub fn new(store: Arc<LogStore>) -> Self {
        LogWriters {
            store,
            queues: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Queue a message for its log
    pub fn dispatch(&mut self, message: RoutedMessage) {
        let RoutedMessage {
            sensor_id,
            measurement,
            entry,
        } = message;
        let key = (sensor_id, measurement);

        let entry = match self.queues.get(&key) {
            Some(queue) => match queue.send(entry) {
                Ok(()) => return,
                Err(mpsc::error::SendError(entry)) => entry,
            },
            None => entry,
        };

        // No writer yet, or the writer died
        let (queue, receiver) = mpsc::unbounded_channel();
        self.tasks.spawn(write_log(
            self.store.clone(),
            key.0.clone(),
            key.1.clone(),
            receiver,
        ));
        let _ = queue.send(entry);
        self.queues.insert(key, queue);
    }

    /// The number of logs with a writer
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Write all the queued messages, then stop the writers
    pub async fn shutdown(mut self) {
        self.queues.clear();
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                error!("A message log writer failed: {err}");
            }
        }
    }
}

async fn write_log(
    store: Arc<LogStore>,
    sensor_id: String,
    measurement: String,
    mut entries: mpsc::UnboundedReceiver<LogEntry>,
) {
    while let Some(entry) = entries.recv().await {
        let topic = entry.topic.clone();
        let store = store.clone();
        let (id, m) = (sensor_id.clone(), measurement.clone());
        match tokio::task::spawn_blocking(move || store.append(&id, &m, entry)).await {
            Ok(Ok(path)) => debug!("Saved message from {topic} to {path:?}"),
            Ok(Err(err)) => {
                error!("Failed to save message of sensor {sensor_id} from {topic}: {err}")
            }
            Err(err) => {
                error!("Failed to save message of sensor {sensor_id} from {topic}: {err}")
            }
        }
    }
}

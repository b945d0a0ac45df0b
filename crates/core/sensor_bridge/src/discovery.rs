use bridge_utils::notify::fs_notify_stream;
use bridge_utils::notify::FsEvent;
use bridge_utils::notify::NotifyStream;
use bridge_utils::notify::NotifyStreamError;
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;

/// Watch the data root for new sensor directories
///
/// Returns the receiver of the candidate paths, each being sent once
/// the debounce delay has elapsed since the first event on that path.
/// The candidates still have to be checked: they might have been removed in the meantime
/// or might not be directories.
pub fn watch_sensor_dirs(
    data_root: &Path,
    debounce: Duration,
) -> Result<mpsc::Receiver<PathBuf>, NotifyStreamError> {
    let fs_notify = fs_notify_stream(&[data_root])?;
    let (candidates, receiver) = mpsc::channel(64);
    info!("Watching for new sensors in {data_root:?}");
    tokio::spawn(debounce_events(fs_notify, debounce, candidates));
    Ok(receiver)
}

/// Coalesce the creation events received for a path during the debounce delay
async fn debounce_events(
    mut fs_notify: NotifyStream,
    delay: Duration,
    candidates: mpsc::Sender<PathBuf>,
) {
    // The delay being fixed, the deadlines are sorted
    let mut pending: VecDeque<(Instant, PathBuf)> = VecDeque::new();

    loop {
        let next_deadline = pending.front().map(|(deadline, _)| *deadline);
        tokio::select! {
            event = fs_notify.rx.recv() => match event {
                Some((path, FsEvent::Created | FsEvent::Renamed)) => {
                    if !pending.iter().any(|(_, pending_path)| pending_path == &path) {
                        debug!("Sensor directory candidate: {path:?}");
                        pending.push_back((Instant::now() + delay, path));
                    }
                }
                Some((_, FsEvent::Removed)) => {}
                None => break,
            },

            _ = sleep_until(next_deadline.unwrap_or_else(Instant::now)), if next_deadline.is_some() => {
                if let Some((_, path)) = pending.pop_front() {
                    if candidates.send(path).await.is_err() {
                        // Nobody listens anymore
                        break;
                    }
                }
            }
        }
    }
}

/// The sensor id of a candidate path, if this is a sensor directory
pub fn sensor_dir_id(path: &Path) -> Option<String> {
    let sensor_id = path.file_name()?.to_str()?;
    if sensor_id.starts_with('.') || !path.is_dir() {
        return None;
    }
    Some(sensor_id.to_string())
}

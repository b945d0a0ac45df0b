use std::path::Path;
use std::path::PathBuf;

use notify::event::CreateKind;
use notify::event::ModifyKind;
use notify::event::RemoveKind;
use notify::event::RenameMode;
use notify::Config;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use strum_macros::Display;
use tokio::sync::mpsc::channel;
use tokio::sync::mpsc::Receiver;

#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FsEvent {
    /// An entry has been created in a watched directory
    Created,
    /// An entry has been moved into a watched directory or renamed there
    Renamed,
    /// An entry has been removed from a watched directory or moved out of it
    Removed,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyStreamError {
    #[error(transparent)]
    FromIOError(#[from] std::io::Error),

    #[error(transparent)]
    FromNotifyError(#[from] notify::Error),

    #[error("Cannot watch {path:?}: not a directory")]
    NotADirectory { path: PathBuf },
}

/// A stream of the entries created, renamed or removed in a set of directories
///
/// Only the immediate children of the watched directories are reported.
pub struct NotifyStream {
    watcher: RecommendedWatcher,
    pub rx: Receiver<(PathBuf, FsEvent)>,
}

impl NotifyStream {
    pub fn try_new() -> Result<Self, NotifyStreamError> {
        let (tx, rx) = channel(1024);

        // The handler is called from the watcher thread, outside of any async runtime
        let watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                let notify_event = match res {
                    Ok(notify_event) => notify_event,
                    Err(err) => {
                        tracing::warn!("File system notification error: {}", err);
                        return;
                    }
                };
                let Some(fs_event) = classify(&notify_event.kind) else {
                    return;
                };
                for path in notify_event.paths {
                    // The receiver has been dropped: nobody cares anymore
                    if tx.blocking_send((path, fs_event)).is_err() {
                        return;
                    }
                }
            },
            Config::default(),
        )?;

        Ok(NotifyStream { watcher, rx })
    }

    /// Watch the entries of a directory
    pub fn add_watcher(&mut self, dir_path: &Path) -> Result<(), NotifyStreamError> {
        if !dir_path.is_dir() {
            return Err(NotifyStreamError::NotADirectory {
                path: dir_path.to_path_buf(),
            });
        }
        self.watcher.watch(dir_path, RecursiveMode::NonRecursive)?;
        Ok(())
    }
}

fn classify(kind: &EventKind) -> Option<FsEvent> {
    match kind {
        EventKind::Create(CreateKind::Folder)
        | EventKind::Create(CreateKind::File)
        | EventKind::Create(CreateKind::Any) => Some(FsEvent::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(FsEvent::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FsEvent::Renamed),
        EventKind::Remove(RemoveKind::Folder)
        | EventKind::Remove(RemoveKind::File)
        | EventKind::Remove(RemoveKind::Any) => Some(FsEvent::Removed),
        _ => None,
    }
}

/// Create a stream watching the given directories
pub fn fs_notify_stream(dirs: &[&Path]) -> Result<NotifyStream, NotifyStreamError> {
    let mut fs_notify = NotifyStream::try_new()?;
    for dir_path in dirs {
        fs_notify.add_watcher(dir_path)?;
    }
    Ok(fs_notify)
}

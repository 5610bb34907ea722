//! Copies the ledger database somewhere safe in the background.
//!
//! A backup is fire-and-forget: [start_backup] returns straight away with a
//! channel of [BackupEvent]s that the presentation layer can drain. The ledger
//! never waits for a backup and never reads its state.

use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::Error;

/// The name the database file is stored under at the destination.
pub const BACKUP_FILE_NAME: &str = "ba.sqlite";

/// A message from a running backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupEvent {
    /// A human-readable status update.
    Status(String),
    /// The backup failed. Sent once, after the last status.
    Failed(String),
}

/// The stages of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProgress {
    /// The upload is queued.
    NotStarted,
    /// The upload is about to send data.
    Starting,
    /// Data is being sent.
    Uploading,
    /// All data was sent.
    Completed,
    /// The upload stopped with an error.
    Failed,
}

impl UploadProgress {
    /// The status text shown for this stage.
    pub fn status_text(self) -> &'static str {
        match self {
            UploadProgress::NotStarted => "The upload has not started.",
            UploadProgress::Starting => "Starting upload...",
            UploadProgress::Uploading => "Uploading...",
            UploadProgress::Completed => "Completed.",
            UploadProgress::Failed => "Error.",
        }
    }
}

/// Somewhere a database file can be uploaded to.
pub trait BackupStorage: Send + Sync + 'static {
    /// Upload `file` into the folder `destination`, or the storage root if
    /// `None`, reporting each stage to `progress`.
    ///
    /// Returns the name the file was stored under.
    ///
    /// # Errors
    /// Returns an error if the file could not be uploaded.
    fn upload(
        &self,
        file: &Path,
        destination: Option<&str>,
        progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<String, Error>;
}

/// Stores backups in a local folder, e.g. a synced cloud drive.
#[derive(Debug, Clone)]
pub struct FolderBackupStorage {
    root: PathBuf,
}

impl FolderBackupStorage {
    /// Store backups under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn destination_folder(&self, destination: Option<&str>) -> Result<PathBuf, Error> {
        let Some(destination) = destination.filter(|destination| !destination.is_empty()) else {
            return Ok(self.root.clone());
        };

        let relative = Path::new(destination);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(Error::Io(format!(
                "the destination folder {destination:?} must be a relative path inside the backup folder"
            )));
        }

        Ok(self.root.join(relative))
    }
}

impl BackupStorage for FolderBackupStorage {
    fn upload(
        &self,
        file: &Path,
        destination: Option<&str>,
        progress: &mut dyn FnMut(UploadProgress),
    ) -> Result<String, Error> {
        progress(UploadProgress::Starting);

        let folder = self.destination_folder(destination)?;
        fs::create_dir_all(&folder)?;

        progress(UploadProgress::Uploading);
        fs::copy(file, folder.join(BACKUP_FILE_NAME))?;

        progress(UploadProgress::Completed);

        Ok(BACKUP_FILE_NAME.to_owned())
    }
}

/// Start backing up the database `file` to `storage` on a blocking task.
///
/// Must be called from within a Tokio runtime. The returned channel closes
/// when the backup has finished.
pub fn start_backup<S: BackupStorage>(
    storage: Arc<S>,
    file: PathBuf,
    destination: Option<String>,
) -> UnboundedReceiver<BackupEvent> {
    let (sender, receiver) = unbounded_channel();

    tokio::task::spawn_blocking(move || {
        run_backup(storage.as_ref(), &file, destination.as_deref(), &sender);
    });

    receiver
}

fn run_backup(
    storage: &dyn BackupStorage,
    file: &Path,
    destination: Option<&str>,
    events: &UnboundedSender<BackupEvent>,
) {
    // The receiver may have been dropped, the backup carries on regardless.
    let send = |event: BackupEvent| {
        let _ = events.send(event);
    };

    tracing::info!("backing up {}", file.display());
    let mut last_progress = UploadProgress::NotStarted;
    let result = storage.upload(file, destination, &mut |progress: UploadProgress| {
        last_progress = progress;
        send(BackupEvent::Status(progress.status_text().to_owned()));
    });

    match result {
        Ok(name) => {
            tracing::info!("backup of {} finished", file.display());
            send(BackupEvent::Status(format!("{name} was uploaded successfully.")));
        }
        Err(error) => {
            tracing::error!("backup of {} failed: {error}", file.display());
            if last_progress != UploadProgress::Failed {
                send(BackupEvent::Status(
                    UploadProgress::Failed.status_text().to_owned(),
                ));
            }
            send(BackupEvent::Failed(error.to_string()));
        }
    }
}

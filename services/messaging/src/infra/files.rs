//! Local filesystem store for uploaded files.
//!
//! Uploads land in the `temporary` folder and are later relocated into a
//! named destination folder once their owning entity exists. Every write and
//! move is validated against the destination folder's policy.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::repository::FileStore;
use crate::domain::types::Folder;
use crate::error::MessagingError;

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("Configuration for folder not found: {0}")]
    ConfigNotFound(String),
    #[error("File extension is not allowed: '{extension}' is not accepted by folder '{folder}'")]
    ExtensionNotAllowed {
        folder: &'static str,
        extension: String,
    },
    #[error("File size exceeds the limit: limit for folder '{folder}' is {limit_mb} MB")]
    TooLarge { folder: &'static str, limit_mb: u64 },
    #[error("Source file does not exist: {0}")]
    SourceMissing(String),
    #[error("Destination file already exists: {0}")]
    DestinationExists(String),
    #[error("Access denied")]
    Forbidden,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<FileStoreError> for MessagingError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::Forbidden => MessagingError::Forbidden("Access denied".to_owned()),
            FileStoreError::Io(e) => {
                MessagingError::Internal(anyhow::Error::new(e).context("file store io"))
            }
            other => MessagingError::BadRequest(other.to_string()),
        }
    }
}

fn parse_folder(name: &str) -> Option<Folder> {
    match name {
        "temporary" => Some(Folder::Temporary),
        "user" => Some(Folder::User),
        "message_media" => Some(Folder::MessageMedia),
        _ => None,
    }
}

/// Lowercased extension including the dot, e.g. `.png`.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// File store rooted at the client directory (`FILES_ROOT`).
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn validate(size: u64, file_name: &str, folder: Folder) -> Result<(), FileStoreError> {
        let policy = folder.policy();
        if size > policy.max_size_bytes {
            return Err(FileStoreError::TooLarge {
                folder: folder.name(),
                limit_mb: policy.max_size_bytes / 1024 / 1024,
            });
        }
        let extension = extension_of(file_name);
        if !policy.allowed_extensions.contains(&extension.as_str()) {
            return Err(FileStoreError::ExtensionNotAllowed {
                folder: folder.name(),
                extension,
            });
        }
        Ok(())
    }

    /// Store an upload in the temporary folder under a collision-free name.
    /// Returns the stored file name (no folder prefix — temporary files are
    /// referenced by bare name until relocated).
    pub async fn save_to_temporary(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, FileStoreError> {
        Self::validate(bytes.len() as u64, original_name, Folder::Temporary)?;

        let folder_path = self.root.join(Folder::Temporary.name());
        tokio::fs::create_dir_all(&folder_path).await?;

        let file_name = format!(
            "{}_{}{}",
            Uuid::new_v4(),
            Utc::now().timestamp(),
            extension_of(original_name)
        );
        tokio::fs::write(folder_path.join(&file_name), bytes).await?;
        Ok(file_name)
    }

    async fn do_move_from_temporary(
        &self,
        file_name: &str,
        destination: Folder,
    ) -> Result<String, FileStoreError> {
        let source_path = self.root.join(Folder::Temporary.name()).join(file_name);
        let metadata = match tokio::fs::metadata(&source_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FileStoreError::SourceMissing(file_name.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        // Re-validate the existing file against the destination folder's rules.
        Self::validate(metadata.len(), file_name, destination)?;

        let destination_dir = self.root.join(destination.name());
        tokio::fs::create_dir_all(&destination_dir).await?;

        let new_name = format!("{}{}", Uuid::new_v4(), extension_of(file_name));
        let destination_path = destination_dir.join(&new_name);
        if tokio::fs::try_exists(&destination_path).await? {
            return Err(FileStoreError::DestinationExists(new_name));
        }

        tokio::fs::rename(&source_path, &destination_path).await?;
        Ok(format!("{}/{}", destination.name(), new_name))
    }

    /// Delete a previously stored file by its client-relative path. Missing
    /// files are not an error.
    pub async fn delete(&self, relative_path: &str) -> Result<(), FileStoreError> {
        if relative_path.is_empty() {
            return Ok(());
        }
        match tokio::fs::remove_file(self.root.join(relative_path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a served-file path under the client root, refusing anything
    /// that would escape it or name an unknown folder.
    pub fn client_path(&self, folder: &str, file_name: &str) -> Result<PathBuf, FileStoreError> {
        let folder = parse_folder(folder).ok_or_else(|| {
            FileStoreError::ConfigNotFound(folder.to_owned())
        })?;

        let candidate = Path::new(file_name);
        let mut components = candidate.components();
        let is_plain_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !is_plain_name {
            return Err(FileStoreError::Forbidden);
        }

        let dest = self.root.join(folder.name()).join(file_name);
        if !dest.starts_with(&self.root) {
            return Err(FileStoreError::Forbidden);
        }
        Ok(dest)
    }

    /// Remove temporary files older than `hours`. Files that disappear
    /// mid-sweep (another process cleaned them) are skipped.
    pub async fn clean_temporary(&self, hours: i64) -> Result<u64, FileStoreError> {
        let folder_path = self.root.join(Folder::Temporary.name());
        let mut entries = match tokio::fs::read_dir(&folder_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let cutoff = std::time::SystemTime::now()
            - std::time::Duration::from_secs((hours.max(0) as u64) * 3600);
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified < cutoff && tokio::fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl FileStore for LocalFileStore {
    async fn move_from_temporary(
        &self,
        file_name: &str,
        destination: Folder,
    ) -> Result<String, MessagingError> {
        Ok(self.do_move_from_temporary(file_name, destination).await?)
    }

    async fn move_from_temporary_replacing(
        &self,
        file_name: &str,
        destination: Folder,
        old_path: Option<&str>,
    ) -> Result<String, MessagingError> {
        let new_path = self.do_move_from_temporary(file_name, destination).await?;
        if let Some(old_path) = old_path {
            if let Err(e) = self.delete(old_path).await {
                tracing::warn!(error = %e, old_path, "could not delete replaced file");
            }
        }
        Ok(new_path)
    }
}

//! Atomic publishing of rendered artifacts
//!
//! Every artifact is staged as `<name>.tmp` in the target directory, fsynced,
//! and renamed over its final name. All temp files are written before the
//! first rename, so a failed write leaves every published file untouched and
//! a concurrent reader only ever sees a complete old or complete new file.
//!
//! Existing files are hard-linked to `<name>.bak` before the renames start.
//! If a later rename fails, the files already moved are restored from those
//! links, so a failed publish never leaves a mix of old and new artifacts.

use crate::feed::{encode_sidecar, RenderedFeed, FEED_FILE_NAME, HTML_FILE_NAME, SIDECAR_FILE_NAME};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Suffix of staged files
pub const TEMP_SUFFIX: &str = ".tmp";

/// Suffix of rollback links to the previous version
pub const BACKUP_SUFFIX: &str = ".bak";

/// Publishing errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// Target directory could not be created
    #[error("Failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Staging a temp file failed
    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Previous version could not be linked for rollback
    #[error("Failed to back up {path:?}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Renaming a staged file into place failed
    #[error("Failed to move {path:?} into place: {source}")]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Structured history could not be serialized
    #[error("Failed to encode history sidecar: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Bytes for each published file
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    /// RSS document
    pub feed: Vec<u8>,
    /// HTML summary
    pub html: String,
    /// Structured history, if kept
    pub sidecar: Option<Vec<u8>>,
}

impl Artifacts {
    /// Artifacts for a rendered feed, including its history sidecar
    pub fn from_rendered(rendered: &RenderedFeed) -> Result<Self, PublishError> {
        Ok(Self {
            feed: rendered.rss.clone(),
            html: rendered.html.clone(),
            sidecar: Some(encode_sidecar(&rendered.records())?),
        })
    }

    /// Files in rename order; the feed goes first
    fn files(&self) -> Vec<(&'static str, &[u8])> {
        let mut files = vec![(FEED_FILE_NAME, self.feed.as_slice())];
        if let Some(sidecar) = &self.sidecar {
            files.push((SIDECAR_FILE_NAME, sidecar.as_slice()));
        }
        files.push((HTML_FILE_NAME, self.html.as_bytes()));
        files
    }
}

/// Staging path for `path`: same directory, `.tmp` appended
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, TEMP_SUFFIX)
}

/// Rollback path for `path`: same directory, `.bak` appended
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, BACKUP_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// A file staged for publishing
struct Staged {
    tmp: PathBuf,
    target: PathBuf,
    /// Link to the version being replaced, if there was one
    backup: Option<PathBuf>,
}

/// Writes artifacts into one output directory
#[derive(Debug, Clone)]
pub struct Publisher {
    target_dir: PathBuf,
}

impl Publisher {
    /// Create a publisher for `target_dir`
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }

    /// Output directory
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Final path of the feed document
    pub fn feed_path(&self) -> PathBuf {
        self.target_dir.join(FEED_FILE_NAME)
    }

    /// Publish all artifacts
    pub async fn publish(&self, artifacts: &Artifacts) -> Result<(), PublishError> {
        publish(artifacts, &self.target_dir).await
    }
}

/// Publish `artifacts` into `target_dir`
pub async fn publish(artifacts: &Artifacts, target_dir: &Path) -> Result<(), PublishError> {
    tokio::fs::create_dir_all(target_dir)
        .await
        .map_err(|source| PublishError::CreateDir {
            path: target_dir.to_path_buf(),
            source,
        })?;

    let mut staged: Vec<Staged> = Vec::new();
    for (name, bytes) in artifacts.files() {
        let target = target_dir.join(name);
        let tmp = temp_path(&target);
        if let Err(source) = write_synced(&tmp, bytes).await {
            discard(staged.iter().map(|s| s.tmp.as_path()).chain([tmp.as_path()])).await;
            return Err(PublishError::Write { path: tmp, source });
        }
        staged.push(Staged {
            tmp,
            target,
            backup: None,
        });
    }

    for i in 0..staged.len() {
        match link_backup(&staged[i].target).await {
            Ok(backup) => staged[i].backup = backup,
            Err(source) => {
                let path = staged[i].target.clone();
                discard(staged.iter().map(|s| s.tmp.as_path())).await;
                discard(staged.iter().filter_map(|s| s.backup.as_deref())).await;
                return Err(PublishError::Backup { path, source });
            }
        }
    }

    for i in 0..staged.len() {
        if let Err(source) = tokio::fs::rename(&staged[i].tmp, &staged[i].target).await {
            roll_back(&staged[..i]).await;
            discard(staged[i..].iter().map(|s| s.tmp.as_path())).await;
            discard(staged.iter().filter_map(|s| s.backup.as_deref())).await;
            return Err(PublishError::Rename {
                path: staged[i].target.clone(),
                source,
            });
        }
        tracing::trace!(path = ?staged[i].target, "Published artifact");
    }

    discard(staged.iter().filter_map(|s| s.backup.as_deref())).await;
    Ok(())
}

/// Hard-link an existing regular file at `target` to its backup path
async fn link_backup(target: &Path) -> std::io::Result<Option<PathBuf>> {
    match tokio::fs::symlink_metadata(target).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    }

    let backup = backup_path(target);
    match tokio::fs::remove_file(&backup).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::hard_link(target, &backup).await?;
    Ok(Some(backup))
}

/// Put back the previous version of files that were already renamed
async fn roll_back(renamed: &[Staged]) {
    for staged in renamed.iter().rev() {
        let restored = match &staged.backup {
            Some(backup) => tokio::fs::rename(backup, &staged.target).await,
            None => tokio::fs::remove_file(&staged.target).await,
        };
        match restored {
            Ok(()) => tracing::debug!(path = ?staged.target, "Restored previous artifact"),
            Err(e) => {
                tracing::error!(path = ?staged.target, error = %e, "Failed to restore previous artifact")
            }
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

/// Best-effort removal of staged or backup files
async fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = ?path, error = %e, "Failed to remove staged file");
            }
        }
    }
}

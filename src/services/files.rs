// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-disk blob storage for uploaded and generated file artifacts.
//!
//! Blobs live at `<root>/<interest>/<fileid>`; metadata lives in the
//! `files` table.

use crate::error::AppError;
use std::path::PathBuf;

/// Tenant-scoped file blob store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Generate a new opaque, globally unique file id.
    pub fn new_file_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Path of a blob. Rejects ids that could escape the interest folder.
    fn blob_path(&self, interest: &str, fileid: &str) -> Result<PathBuf, AppError> {
        for part in [interest, fileid] {
            if part.is_empty()
                || part.starts_with('.')
                || part.contains(['/', '\\'])
            {
                return Err(AppError::BadRequest(format!("Invalid file path component {:?}", part)));
            }
        }
        Ok(self.root.join(interest).join(fileid))
    }

    /// Write (or overwrite) a blob.
    pub async fn write(&self, interest: &str, fileid: &str, contents: &[u8]) -> Result<(), AppError> {
        let path = self.blob_path(interest, fileid)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Storage(format!("create {}: {}", dir.display(), e)))?;
        }
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {}", path.display(), e)))?;

        tracing::debug!(interest, fileid, bytes = contents.len(), "Stored blob");
        Ok(())
    }

    /// Read a blob.
    pub async fn read(&self, interest: &str, fileid: &str) -> Result<Vec<u8>, AppError> {
        let path = self.blob_path(interest, fileid)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("File {}", fileid)))
            }
            Err(e) => Err(AppError::Storage(format!("read {}: {}", path.display(), e))),
        }
    }

    /// Delete a blob. A missing blob is not an error.
    pub async fn delete(&self, interest: &str, fileid: &str) -> Result<(), AppError> {
        let path = self.blob_path(interest, fileid)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(interest, fileid, "Blob already missing on delete");
                Ok(())
            }
            Err(e) => Err(AppError::Storage(format!("delete {}: {}", path.display(), e))),
        }
    }
}

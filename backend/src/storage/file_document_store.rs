//! # File Document Store
//!
//! Persists the local bill document as a single JSON file:
//!
//! ```text
//! data/
//! └── bill_tracker_state.json
//! ```
//!
//! Writes go to a temp file that is then renamed over the target, so a
//! failed save never leaves a half-written document behind.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::traits::DocumentStore;

pub const DOCUMENT_FILE_NAME: &str = "bill_tracker_state.json";

#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    path: PathBuf,
}

impl FileDocumentStore {
    /// Store the document as `DOCUMENT_FILE_NAME` inside `base_directory`
    pub fn in_directory(base_directory: &Path) -> Self {
        Self {
            path: base_directory.join(DOCUMENT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileDocumentStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                debug!("Loaded bill document from {:?}", self.path);
                Ok(Some(contents))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        }
    }

    fn save(&self, json: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create data directory {:?}", parent))?;
                info!("Created data directory: {:?}", parent);
            }
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).with_context(|| format!("Failed to write {:?}", temp_path))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;

        debug!("Saved bill document to {:?}", self.path);
        Ok(())
    }

    fn wipe(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed bill document {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", self.path)),
        }
    }
}

use std::{fs, io::ErrorKind, path::PathBuf};

use anyhow::{Context, Result};
use client_core::CredentialStore;
use tracing::debug;

/// Bearer-token persistence in a plain file; the desktop stand-in for
/// the browser localStorage the hosted client uses.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if token.is_empty() {
                    None
                } else {
                    Some(token)
                }
            }
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    debug!(error = %err, "failed to read credential file");
                }
                None
            }
        }
    }

    fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, token)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }
}

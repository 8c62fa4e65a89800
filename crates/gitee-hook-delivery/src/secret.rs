//! Webhook secret sources.
//!
//! The validator asks a [`SecretProvider`] for the current secret on every
//! request, so a rotated secret takes effect without a restart.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use hook_std::fs::ReadFile;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Supplies the current HMAC secret. `None` means no usable secret, which the
/// validator treats exactly like a bad signature.
pub trait SecretProvider: Send + Sync + 'static {
    fn current_secret(&self) -> Option<Vec<u8>>;
}

impl<T: SecretProvider> SecretProvider for Arc<T> {
    fn current_secret(&self) -> Option<Vec<u8>> {
        (**self).current_secret()
    }
}

/// A fixed secret.
#[derive(Debug, Clone)]
pub struct StaticSecret(Vec<u8>);

impl StaticSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }
}

impl SecretProvider for StaticSecret {
    fn current_secret(&self) -> Option<Vec<u8>> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("failed to read secret file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secret file {path} is empty")]
    Empty { path: PathBuf },
}

/// Secret read from a file, kept current by polling.
///
/// Surrounding whitespace (typically a trailing newline from a mounted
/// Kubernetes secret) is trimmed. A failed reload keeps the last good value.
#[derive(Debug, Clone)]
pub struct FileSecret {
    path: PathBuf,
    current: Arc<RwLock<Option<Vec<u8>>>>,
}

impl FileSecret {
    /// Reads the file once; fails when it is unreadable or blank.
    pub fn load<F: ReadFile>(fs: &F, path: impl Into<PathBuf>) -> Result<Self, SecretError> {
        let path = path.into();
        let secret = read_secret(fs, &path)?;
        Ok(Self {
            path,
            current: Arc::new(RwLock::new(Some(secret))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and swaps in the new value.
    pub fn reload<F: ReadFile>(&self, fs: &F) -> Result<(), SecretError> {
        let secret = read_secret(fs, &self.path)?;
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if current.as_deref() != Some(secret.as_slice()) {
            info!(path = %self.path.display(), "Webhook secret rotated");
        }
        *current = Some(secret);
        Ok(())
    }

    /// Polls the file every `interval` until the returned handle is aborted.
    pub fn spawn_refresh<F>(&self, fs: F, interval: Duration) -> JoinHandle<()>
    where
        F: ReadFile + Send + 'static,
    {
        let secret = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately and the value is already loaded.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = secret.reload(&fs) {
                    warn!(error = %e, "Failed to refresh webhook secret, keeping previous value");
                }
            }
        })
    }
}

impl SecretProvider for FileSecret {
    fn current_secret(&self) -> Option<Vec<u8>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn read_secret<F: ReadFile>(fs: &F, path: &Path) -> Result<Vec<u8>, SecretError> {
    let raw = fs.read_to_string(path).map_err(|source| SecretError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SecretError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(trimmed.as_bytes().to_vec())
}

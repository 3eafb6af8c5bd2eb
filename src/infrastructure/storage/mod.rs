//! Session directory and the small key/value files transports keep in it

use std::path::{Path, PathBuf};

use crate::application::errors::ConfigError;
use crate::infrastructure::logging::LogSink;

/// File-backed session storage rooted at the sessions directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_path: PathBuf,
}

impl SessionStore {
    /// Make sure the sessions directory exists. Failing to create it is fatal
    /// for the caller; the bot cannot keep a session without it.
    pub async fn prepare(
        base_path: impl Into<PathBuf>,
        sink: &LogSink,
    ) -> Result<Self, ConfigError> {
        let base_path = base_path.into();

        match tokio::fs::metadata(&base_path).await {
            Ok(meta) if meta.is_dir() => {
                tracing::info!("📂 Using existing sessions directory: {}", base_path.display());
            }
            Ok(_) => {
                let err = std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "exists but is not a directory",
                );
                return Err(ConfigError::storage(base_path, err));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&base_path)
                    .await
                    .map_err(|e| ConfigError::storage(&base_path, e))?;
                sink.log_info(
                    format_args!("Sessions directory created: {}", base_path.display()),
                    "SessionStore",
                );
            }
            Err(e) => return Err(ConfigError::storage(base_path, e)),
        }

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.state", safe))
    }

    /// Read a stored value; missing or unreadable keys read as `None`
    pub async fn read_value(&self, key: &str) -> Option<String> {
        tokio::fs::read_to_string(self.key_path(key))
            .await
            .ok()
            .map(|s| s.trim().to_string())
    }

    pub async fn write_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let path = self.key_path(key);
        tokio::fs::write(&path, value)
            .await
            .map_err(|e| ConfigError::storage(path, e))
    }
}

//! CLI configuration.
//!
//! Loaded from `NESTLY_*` environment variables, then narrowed by command
//! line flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use nestly_storage::{MemoryBackend, RedbBackend, StorageBackend};
use tracing::debug;

/// Page that links are attached to when printed as full URLs.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173/";

/// Public shortener used when no proxy is configured.
pub const DEFAULT_SHORTENER_URL: &str = "https://tinyurl.com/api-create.php";

const DATABASE_FILE: &str = "nestly.redb";

/// Where the recent-links ledger lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    /// Nothing written to disk.
    Memory,
    /// A redb file inside the data directory.
    Redb,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Directory holding the ledger database.
    pub data_dir: PathBuf,
    pub storage: StorageKind,
    /// Endpoint asked for short links (`?url=` is appended).
    pub shortener_url: String,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl CliConfig {
    /// Load configuration from the environment.
    ///
    /// - `NESTLY_DATA_DIR`: ledger directory (default: platform data dir)
    /// - `NESTLY_STORAGE`: `redb` or `memory` (default: `redb`)
    /// - `NESTLY_SHORTENER_URL`: shortener endpoint (default: TinyURL)
    /// - `NESTLY_LOG_LEVEL`: log filter (default: `warn`)
    #[must_use]
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os("NESTLY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let storage = match std::env::var("NESTLY_STORAGE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageKind::Memory,
            _ => StorageKind::Redb,
        };

        let shortener_url = std::env::var("NESTLY_SHORTENER_URL")
            .unwrap_or_else(|_| DEFAULT_SHORTENER_URL.to_owned());

        let log_level =
            std::env::var("NESTLY_LOG_LEVEL").unwrap_or_else(|_| "warn".to_owned());

        Self {
            data_dir,
            storage,
            shortener_url,
            log_level,
        }
    }

    /// Open the configured ledger storage, creating the data directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the database cannot be
    /// opened.
    pub fn open_storage(&self) -> Result<Arc<dyn StorageBackend>> {
        match self.storage {
            StorageKind::Memory => Ok(Arc::new(MemoryBackend::new())),
            StorageKind::Redb => {
                std::fs::create_dir_all(&self.data_dir).with_context(|| {
                    format!("failed to create data dir {}", self.data_dir.display())
                })?;
                let path = self.data_dir.join(DATABASE_FILE);
                debug!(path = %path.display(), "opening ledger database");
                let backend = RedbBackend::open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                Ok(Arc::new(backend))
            }
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("app", "Nestly", "nestly")
        .map_or_else(|| PathBuf::from(".nestly"), |dirs| dirs.data_dir().to_path_buf())
}

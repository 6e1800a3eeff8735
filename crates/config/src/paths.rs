//! Path utilities

use std::path::{Path, PathBuf};

/// Advisor data directory (~/.advisor)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".advisor")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Persisted transcripts
pub fn sessions_dir() -> PathBuf {
    data_dir().join("sessions")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

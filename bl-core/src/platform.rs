//! Platform path helpers.

use std::path::PathBuf;

use crate::error::{BlError, BlResult};

/// Platform-specific path lookups.
pub struct Platform;

impl Platform {
    /// Application data directory (config, logs).
    ///
    /// Resolves to the OS-conventional per-user data dir, e.g.
    /// `~/.local/share/bookline` on Linux.
    pub fn data_dir() -> BlResult<PathBuf> {
        dirs::data_dir()
            .map(|d| d.join("bookline"))
            .ok_or_else(|| BlError::Config("could not determine platform data directory".into()))
    }

    /// Directory for log files.
    pub fn log_dir() -> BlResult<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_ends_with_app_name() {
        let dir = Platform::data_dir().unwrap();
        assert!(dir.ends_with("bookline"));
    }

    #[test]
    fn test_log_dir_under_data_dir() {
        let data = Platform::data_dir().unwrap();
        let logs = Platform::log_dir().unwrap();
        assert!(logs.starts_with(data));
    }
}

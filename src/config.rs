//! Runtime configuration
//!
//! All user data (database, uploads, archived PDFs, logs) lives under a
//! single data directory: `$REFSYNC_DATA_DIR` if set, otherwise `~/.refsync`.

use std::env;
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub arxiv_api_base: String,
    pub ads_api_base: String,
}

impl Settings {
    /// Build settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let data_dir = env::var("REFSYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let host = env::var("REFSYNC_HOST")
            .ok()
            .and_then(|h| h.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let port = env::var("REFSYNC_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let static_dir = env::var("REFSYNC_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));

        Self::with_data_dir(data_dir, host, port, static_dir)
    }

    /// Build settings rooted at an explicit data directory.
    pub fn with_data_dir(
        data_dir: PathBuf,
        host: IpAddr,
        port: u16,
        static_dir: PathBuf,
    ) -> Self {
        Self {
            app_name: "RefSync".to_string(),
            host,
            port,
            data_dir,
            static_dir,
            arxiv_api_base: "https://export.arxiv.org/api/query".to_string(),
            ads_api_base: "https://api.adsabs.harvard.edu/v1".to_string(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("library.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.data_dir.join("pdfs")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// Create the data directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.data_dir.as_path(),
            &self.uploads_dir(),
            &self.pdf_dir(),
            &self.logs_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".refsync")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        let settings = Settings::with_data_dir(
            PathBuf::from("/tmp/refsync-test"),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            8000,
            PathBuf::from("static"),
        );

        assert_eq!(
            settings.database_path(),
            PathBuf::from("/tmp/refsync-test/library.db")
        );
        assert_eq!(
            settings.uploads_dir(),
            PathBuf::from("/tmp/refsync-test/uploads")
        );
        assert_eq!(
            settings.settings_path(),
            PathBuf::from("/tmp/refsync-test/settings.json")
        );
    }
}

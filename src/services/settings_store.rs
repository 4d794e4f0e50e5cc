//! Persistent app settings, including the ADS API key
//!
//! Settings live in `settings.json` inside the data directory. The file is
//! written with owner-only permissions on Unix.

use reqwest::Client;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const ADS_KEY_FIELD: &str = "ads_api_key";

/// File-backed settings store
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Map<String, Value> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!("Settings file at {:?} is unreadable, starting fresh", self.path);
                Map::new()
            }
        }
    }

    fn save(&self, data: &Map<String, Value>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(data.clone()))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600));
        }

        Ok(())
    }

    /// Get the stored ADS API key, or None if not set.
    pub fn get_ads_api_key(&self) -> Option<String> {
        self.load()
            .get(ADS_KEY_FIELD)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// Set the ADS API key; an empty key clears it.
    pub fn set_ads_api_key(&self, api_key: &str) -> io::Result<()> {
        let mut data = self.load();
        if api_key.is_empty() {
            data.remove(ADS_KEY_FIELD);
        } else {
            data.insert(ADS_KEY_FIELD.to_string(), Value::String(api_key.to_string()));
        }
        self.save(&data)
    }

    pub fn has_ads_api_key(&self) -> bool {
        self.get_ads_api_key().is_some()
    }
}

/// Validate an ADS API key by making a one-row test query.
///
/// Returns (is_valid, message); network problems count as invalid with a
/// human-readable message.
pub async fn validate_ads_api_key(client: &Client, api_base: &str, api_key: &str) -> (bool, String) {
    if api_key.len() < 10 {
        return (false, "API key appears to be invalid (too short)".to_string());
    }

    let result = client
        .get(format!("{}/search/query", api_base))
        .query(&[("q", "test"), ("rows", "1")])
        .bearer_auth(api_key)
        .timeout(Duration::from_secs(10))
        .send()
        .await;

    match result {
        Ok(resp) => match resp.status().as_u16() {
            200 => (true, "API key is valid".to_string()),
            401 => (false, "Invalid API key".to_string()),
            403 => (false, "API key lacks required permissions".to_string()),
            status => (false, format!("Unexpected response: {}", status)),
        },
        Err(e) if e.is_timeout() => (false, "Connection to ADS timed out".to_string()),
        Err(e) => (false, format!("Connection error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_clear_key() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        assert!(!store.has_ads_api_key());
        assert!(store.get_ads_api_key().is_none());

        store.set_ads_api_key("abcdef1234567890").unwrap();
        assert!(store.has_ads_api_key());
        assert_eq!(store.get_ads_api_key().as_deref(), Some("abcdef1234567890"));

        store.set_ads_api_key("").unwrap();
        assert!(!store.has_ads_api_key());
    }

    #[test]
    fn test_corrupt_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json at all").unwrap();

        let store = SettingsStore::new(path);
        assert!(store.get_ads_api_key().is_none());

        // Writing over a corrupt file works
        store.set_ads_api_key("abcdef1234567890").unwrap();
        assert!(store.has_ads_api_key());
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone());
        store.set_ads_api_key("abcdef1234567890").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

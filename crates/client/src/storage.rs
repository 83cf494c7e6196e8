//! Persistent key/value storage.
//!
//! Values are JSON files in the platform config directory:
//! - Linux: `~/.config/repack/`
//! - macOS: `~/Library/Application Support/repack/`
//! - Windows: `%APPDATA%\repack\`

use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};

const APP_DIR: &str = "repack";

/// A directory of JSON documents keyed by name.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Storage under the platform config directory, created if missing.
    pub fn platform() -> Option<Self> {
        let dir = dirs::config_dir()?.join(APP_DIR);
        Self::at(dir)
    }

    /// Storage rooted at `dir`, created if missing.
    pub fn at(dir: impl Into<PathBuf>) -> Option<Self> {
        let dir = dir.into();
        if !dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::warn!("Cannot create storage dir {}: {}", dir.display(), e);
                return None;
            }
        }
        Some(Self { dir })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        // Sanitize key to be a valid filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.dir.join(format!("{}.json", safe_key))
    }

    /// Save a value. Returns `true` if the write succeeded.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Cannot serialize '{}': {}", key, e);
                return false;
            }
        };
        std::fs::write(self.file_path(key), json).is_ok()
    }

    /// Load a value. `None` if missing or unreadable.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = std::fs::read_to_string(self.file_path(key)).ok()?;
        serde_json::from_str(&json).ok()
    }

    pub fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.file_path(key));
    }

    pub fn exists(&self, key: &str) -> bool {
        self.file_path(key).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path().join("nested")).unwrap();

        assert!(storage.save("session/current", &vec![1, 2, 3]));
        assert!(storage.exists("session/current"));
        assert_eq!(storage.load::<Vec<i32>>("session/current"), Some(vec![1, 2, 3]));

        storage.remove("session/current");
        assert!(!storage.exists("session/current"));
        assert_eq!(storage.load::<Vec<i32>>("session/current"), None);
    }

    #[test]
    fn corrupt_values_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::at(dir.path()).unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert_eq!(storage.load::<Vec<i32>>("bad"), None);
    }
}

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Normalized title -> AniList ID, persisted as a JSON object.
#[derive(Debug, Default)]
pub struct IdentifierCache {
    path: PathBuf,
    entries: BTreeMap<String, u64>,
}

impl IdentifierCache {
    /// Reads the whole cache file. A missing or unreadable file yields an empty
    /// cache; entries whose value is not an ID are dropped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => parse_entries(&content, &path),
            Err(_) => BTreeMap::new(),
        };
        tracing::debug!("Loaded {} cached IDs from {}", entries.len(), path.display());
        Self { path, entries }
    }

    pub fn get(&self, normalized_title: &str) -> Option<u64> {
        self.entries.get(normalized_title).copied()
    }

    /// Records the ID in memory, then rewrites the whole file. The in-memory
    /// value is kept even when the write fails.
    pub fn put(&mut self, normalized_title: &str, id: u64) -> Result<()> {
        self.entries.insert(normalized_title.to_string(), id);
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn save(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        // Create parent directory if it doesn't exist
        fs::create_dir_all(parent)?;

        let content = serde_json::to_string_pretty(&self.entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        // Keep whatever mode an existing cache file was given.
        if let Ok(existing) = fs::metadata(&self.path) {
            fs::set_permissions(tmp.path(), existing.permissions())?;
        }
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write cache {}", self.path.display()))?;
        Ok(())
    }
}

fn parse_entries(content: &str, path: &Path) -> BTreeMap<String, u64> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(content) else {
        tracing::warn!("Ignoring unreadable cache file {}", path.display());
        return BTreeMap::new();
    };

    map.into_iter()
        .filter_map(|(title, value)| match value.as_u64() {
            Some(id) => Some((title, id)),
            None => {
                tracing::warn!("Dropping invalid cache entry for '{title}'");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_across_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("cache.json");

        let mut cache = IdentifierCache::load(&path);
        assert_eq!(cache.get("bleach"), None);
        cache.put("bleach", 116).unwrap();

        let reloaded = IdentifierCache::load(&path);
        assert_eq!(reloaded.get("bleach"), Some(116));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");

        let mut cache = IdentifierCache::load(&path);
        cache.put("frieren", 1).unwrap();
        cache.put("frieren", 154587).unwrap();

        assert_eq!(IdentifierCache::load(&path).get("frieren"), Some(154587));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = IdentifierCache::load(temp_dir.path().join("absent.json"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let mut cache = IdentifierCache::load(&path);
        assert_eq!(cache.len(), 0);

        // The next put replaces the corrupt content.
        cache.put("bleach", 116).unwrap();
        assert_eq!(IdentifierCache::load(&path).get("bleach"), Some(116));
    }

    #[test]
    fn test_partially_corrupt_file_keeps_valid_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(
            &path,
            r#"{"bleach": 116, "broken": "abc", "negative": -4, "naruto": 20}"#,
        )
        .unwrap();

        let cache = IdentifierCache::load(&path);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("bleach"), Some(116));
        assert_eq!(cache.get("naruto"), Some(20));
        assert_eq!(cache.get("broken"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        IdentifierCache::load(&path).put("bleach", 116).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

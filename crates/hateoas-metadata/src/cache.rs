//! On-disk cache of merged relation metadata.
//!
//! Entries live under `<cache_dir>/metadata/` as one JSON file per class and
//! record the SHA-256 of every relation file they were built from, so that a
//! debug build can detect edits.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use hateoas_core::class::PATH_SEPARATOR;
use hateoas_core::{ClassRelationMetadata, ConfigError};

use crate::locator::ensure_dir;

/// Name of the subdirectory holding metadata entries.
pub const METADATA_CACHE_DIR: &str = "metadata";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHash {
    pub path: PathBuf,
    pub sha256: String,
}

impl SourceHash {
    /// Hash the current content of `path`; `None` if it cannot be read.
    #[must_use]
    pub fn of(path: &Path) -> Option<Self> {
        let content = fs::read(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            sha256: sha256_hex(&content),
        })
    }

    /// Whether the file still exists with the same content.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        fs::read(&self.path).is_ok_and(|content| sha256_hex(&content) == self.sha256)
    }
}

/// One cached class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub class: String,
    /// `None` records that the class has no relations at all.
    pub metadata: Option<ClassRelationMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceHash>,
    /// Every relation came from one of `sources`. Relations declared in
    /// code leave no trace on disk, so such entries cannot be revalidated.
    #[serde(default)]
    pub file_backed: bool,
}

impl CacheEntry {
    /// Whether the entry can be trusted without reloading: it is file
    /// backed and none of its sources changed.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.file_backed && self.sources.iter().all(SourceHash::is_fresh)
    }
}

#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `<cache_dir>/metadata/`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DirectoryOrCacheWrite`] if the directory cannot
    /// be created or is not writable.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = cache_dir.as_ref().join(METADATA_CACHE_DIR);
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the entry for `class`. Unreadable or corrupt entries count as
    /// misses.
    #[must_use]
    pub fn load(&self, class: &str) -> Option<CacheEntry> {
        let path = self.entry_path(class);
        let content = fs::read(&path).ok()?;
        match serde_json::from_slice::<CacheEntry>(&content) {
            Ok(entry) if entry.class == class => Some(entry),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt metadata cache entry");
                None
            }
        }
    }

    /// Write the entry. Failures are logged and otherwise ignored.
    pub fn store(&self, entry: &CacheEntry) {
        let path = self.entry_path(&entry.class);
        let result = serde_json::to_vec_pretty(entry)
            .map_err(std::io::Error::other)
            .and_then(|bytes| fs::write(&path, bytes));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "could not write metadata cache entry");
        }
    }

    fn entry_path(&self, class: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", class.replace(PATH_SEPARATOR, ".")))
    }
}

fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hateoas_core::Relation;
    use tempfile::TempDir;

    fn entry(class: &str, sources: Vec<SourceHash>) -> CacheEntry {
        CacheEntry {
            class: class.to_string(),
            metadata: Some(ClassRelationMetadata::new(
                class,
                vec![Relation::new("self").with_href("/x")],
            )),
            file_backed: true,
            sources,
        }
    }

    #[test]
    fn entries_survive_a_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();
        assert!(dir.path().join("metadata").is_dir());

        let stored = entry("app::User", Vec::new());
        cache.store(&stored);
        assert!(cache.dir().join("app.User.json").is_file());
        assert_eq!(cache.load("app::User"), Some(stored));
        assert_eq!(cache.load("app::Post"), None);
    }

    #[test]
    fn edited_sources_make_entries_stale() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("User.yml");
        fs::write(&source, "a").unwrap();

        let cached = entry("app::User", vec![SourceHash::of(&source).unwrap()]);
        assert!(cached.is_fresh());

        fs::write(&source, "b").unwrap();
        assert!(!cached.is_fresh());

        fs::remove_file(&source).unwrap();
        assert!(!cached.is_fresh());
    }

    #[test]
    fn corrupt_entries_are_misses() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();
        fs::write(cache.dir().join("app.User.json"), "not json").unwrap();
        assert_eq!(cache.load("app::User"), None);
    }

    #[test]
    fn unwritable_cache_dir_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            FileCache::new(&file),
            Err(ConfigError::DirectoryOrCacheWrite { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn read_only_cache_dir_is_a_config_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let metadata = dir.path().join(METADATA_CACHE_DIR);
        fs::create_dir(&metadata).unwrap();
        fs::set_permissions(&metadata, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind root.
        let privileged = fs::write(metadata.join("check"), "").is_ok();
        let result = FileCache::new(dir.path());
        fs::set_permissions(&metadata, fs::Permissions::from_mode(0o755)).unwrap();

        if !privileged {
            assert!(matches!(
                result,
                Err(ConfigError::DirectoryOrCacheWrite { path, .. }) if path == metadata
            ));
        }
    }

    #[test]
    fn write_checks_leave_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path()).unwrap();
        FileCache::new(dir.path()).unwrap();
        assert_eq!(fs::read_dir(cache.dir()).unwrap().count(), 0);
    }

    #[test]
    fn sha256_is_hex_encoded() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

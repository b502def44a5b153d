//! Maps class names to relation files through namespace-prefixed
//! directories.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use hateoas_core::class::PATH_SEPARATOR;
use hateoas_core::ConfigError;

/// Extensions tried, in order, for each candidate file.
pub const RELATION_FILE_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Namespace prefix → directory map.
///
/// A class `app::model::billing::Invoice` with a directory registered for
/// the prefix `app::model` resolves to `<dir>/billing.Invoice.yml`. The empty
/// prefix matches every class.
#[derive(Debug, Clone, Default)]
pub struct FileLocator {
    dirs: Vec<(String, PathBuf)>,
}

impl FileLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory for a namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDirectory`] if `dir` does not exist and
    /// [`ConfigError::DuplicateMetadataDirectory`] if the prefix is already
    /// registered.
    pub fn add_dir(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let prefix = normalize_prefix(prefix);
        let dir = existing_dir(dir.into())?;
        if self.position(&prefix).is_some() {
            return Err(ConfigError::DuplicateMetadataDirectory { prefix });
        }
        self.dirs.push((prefix, dir));
        Ok(())
    }

    /// Replace the directory of an already registered prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDirectory`] if `dir` does not exist and
    /// [`ConfigError::UnknownMetadataDirectory`] if the prefix was never
    /// added.
    pub fn replace_dir(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let prefix = normalize_prefix(prefix);
        let dir = existing_dir(dir.into())?;
        match self.position(&prefix) {
            Some(i) => {
                self.dirs[i].1 = dir;
                Ok(())
            }
            None => Err(ConfigError::UnknownMetadataDirectory { prefix }),
        }
    }

    /// Drop every registered directory and add the given ones.
    ///
    /// # Errors
    ///
    /// Same as [`FileLocator::add_dir`]. On error the locator keeps the
    /// directories added before the failing one.
    pub fn set_dirs<I, P, D>(&mut self, dirs: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (P, D)>,
        P: AsRef<str>,
        D: Into<PathBuf>,
    {
        self.dirs.clear();
        for (prefix, dir) in dirs {
            self.add_dir(prefix.as_ref(), dir)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn dirs(&self) -> &[(String, PathBuf)] {
        &self.dirs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// First existing relation file for `class_name`, trying directories in
    /// registration order.
    #[must_use]
    pub fn find_file(&self, class_name: &str) -> Option<PathBuf> {
        self.dirs.iter().find_map(|(prefix, dir)| {
            let relative = relative_class_path(class_name, prefix)?;
            RELATION_FILE_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{relative}.{ext}")))
                .find(|path| path.is_file())
        })
    }

    fn position(&self, prefix: &str) -> Option<usize> {
        self.dirs.iter().position(|(known, _)| known == prefix)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix
        .trim_start_matches(PATH_SEPARATOR)
        .trim_end_matches(PATH_SEPARATOR)
        .to_string()
}

fn existing_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(ConfigError::MissingDirectory(dir))
    }
}

/// The part of `class_name` below `prefix`, with path separators turned into
/// dots. `None` when the class lies outside the prefix.
fn relative_class_path(class_name: &str, prefix: &str) -> Option<String> {
    let rest = if prefix.is_empty() {
        class_name
    } else {
        class_name
            .strip_prefix(prefix)?
            .strip_prefix(PATH_SEPARATOR)?
    };
    if rest.is_empty() {
        return None;
    }
    Some(rest.replace(PATH_SEPARATOR, "."))
}

/// Creates `path` if needed and checks that files can be written in it.
pub(crate) fn ensure_dir(path: &Path) -> Result<(), ConfigError> {
    static CHECKS: AtomicUsize = AtomicUsize::new(0);

    let failed = |source: std::io::Error| ConfigError::DirectoryOrCacheWrite {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(path).map_err(failed)?;

    let check = path.join(format!(
        ".write-check-{}-{}",
        std::process::id(),
        CHECKS.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::write(&check, b"").map_err(failed)?;
    std::fs::remove_file(&check).map_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn relative_paths_follow_prefix() {
        assert_eq!(
            relative_class_path("app::model::billing::Invoice", "app::model").as_deref(),
            Some("billing.Invoice")
        );
        assert_eq!(
            relative_class_path("app::model::User", "").as_deref(),
            Some("app.model.User")
        );
        assert_eq!(relative_class_path("app::modelling::User", "app::model"), None);
        assert_eq!(relative_class_path("other::User", "app"), None);
    }

    #[test]
    fn find_file_tries_both_extensions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("User.yaml"), "{}").unwrap();

        let mut locator = FileLocator::new();
        locator.add_dir("::app::model::", dir.path()).unwrap();

        assert_eq!(locator.dirs()[0].0, "app::model");
        assert_eq!(
            locator.find_file("app::model::User"),
            Some(dir.path().join("User.yaml"))
        );
        assert_eq!(locator.find_file("app::model::Post"), None);
    }

    #[test]
    fn directory_registration_errors() {
        let dir = TempDir::new().unwrap();
        let mut locator = FileLocator::new();

        let missing = dir.path().join("missing");
        assert!(matches!(
            locator.add_dir("app", &missing),
            Err(ConfigError::MissingDirectory(path)) if path == missing
        ));

        locator.add_dir("app", dir.path()).unwrap();
        assert!(matches!(
            locator.add_dir("app", dir.path()),
            Err(ConfigError::DuplicateMetadataDirectory { prefix }) if prefix == "app"
        ));
        assert!(matches!(
            locator.replace_dir("other", dir.path()),
            Err(ConfigError::UnknownMetadataDirectory { prefix }) if prefix == "other"
        ));
        locator.replace_dir("app", dir.path()).unwrap();
    }

    #[test]
    fn set_dirs_replaces_everything() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let mut locator = FileLocator::new();
        locator.add_dir("a", first.path()).unwrap();

        locator
            .set_dirs([("b", second.path()), ("c", first.path())])
            .unwrap();
        let prefixes: Vec<&str> = locator.dirs().iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(prefixes, vec!["b", "c"]);
    }
}

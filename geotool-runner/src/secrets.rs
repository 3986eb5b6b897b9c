//! Secrets file resolver
//!
//! Reads the flat `KEY=VALUE` file holding the daemon URI, database
//! connection components and shared data roots. Pure lookup: the file is read
//! once and the result is treated as read-only.

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;

/// Default secrets file name, relative to the working directory
pub const DEFAULT_SECRETS_FILE: &str = "secret.txt";

/// Parsed secrets file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    entries: HashMap<String, String>,
}

impl Secrets {
    /// Loads and parses a secrets file
    ///
    /// # Arguments
    /// * `path` - Path to the secrets file
    ///
    /// # Errors
    /// `ConfigError::Unreadable` if the file cannot be read,
    /// `ConfigError::Malformed` if a line has no `=`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let secrets = Self::parse(&content)?;
        debug!("Loaded {} secret(s) from {}", secrets.len(), path.display());
        Ok(secrets)
    }

    /// Parses secrets from text
    ///
    /// Splits each line on the first `=`, so values may contain `=`.
    /// Blank lines are skipped.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut entries = HashMap::new();

        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or(ConfigError::Malformed { line: idx + 1 })?;

            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Malformed { line: idx + 1 });
            }

            entries.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Self { entries })
    }

    /// Looks up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Looks up a key that must be present
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Iterates over all entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for Secrets {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_splits_on_first_equals() {
        let secrets = Secrets::parse(
            "PODMAN_URI=unix:///run/podman/podman.sock\nTOKEN=abc==\n",
        )
        .unwrap();

        assert_eq!(
            secrets.get("PODMAN_URI"),
            Some("unix:///run/podman/podman.sock")
        );
        assert_eq!(secrets.get("TOKEN"), Some("abc=="));
        assert_eq!(secrets.len(), 2);
    }

    #[test]
    fn test_parse_rejects_line_without_separator() {
        let err = Secrets::parse("HOST=db\nnot a pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 2 }));
    }

    #[test]
    fn test_parse_rejects_empty_key() {
        let err = Secrets::parse("=value").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 1 }));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let secrets = Secrets::parse("\nHOST=db\n   \nPORT=5432\n").unwrap();
        assert_eq!(secrets.get("HOST"), Some("db"));
        assert_eq!(secrets.get("PORT"), Some("5432"));
    }

    #[test]
    fn test_require_missing_key() {
        let secrets = Secrets::default();
        let err = secrets.require("GEOAPI_PATH").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(k) if k == "GEOAPI_PATH"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PODMAN_URI=unix:///run/podman/podman.sock").unwrap();
        writeln!(file, "DATABASE=metacatalog").unwrap();

        let secrets = Secrets::load(file.path()).unwrap();
        assert_eq!(secrets.get("DATABASE"), Some("metacatalog"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Secrets::load("/nonexistent/secret.txt").unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}

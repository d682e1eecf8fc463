use crate::error::{PublishError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Key/value pairs read from a `.env` file.
///
/// The process environment is never mutated. For a loaded file, lookups
/// consult it first so an exported variable wins over the file, the same
/// precedence a non-overriding `dotenvy::from_path` load gives.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    values: HashMap<String, String>,
    inherit_process_env: bool,
}

impl EnvFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PublishError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }

        let parse_err = |source| PublishError::ConfigParse {
            path: path.to_path_buf(),
            source,
        };

        let mut values = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(parse_err)? {
            let (key, value) = item.map_err(parse_err)?;
            values.insert(key, value);
        }

        tracing::debug!(path = %path.display(), keys = values.len(), "loaded env file");
        Ok(Self {
            values,
            inherit_process_env: true,
        })
    }

    /// Fixed values with no process environment overlay.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            inherit_process_env: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inherit_process_env
            .then(|| std::env::var(key).ok())
            .flatten()
            .or_else(|| self.values.get(key).cloned())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_config_missing() {
        let dir = TempDir::new().unwrap();
        let err = EnvFile::load(&dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, PublishError::ConfigMissing { .. }));
    }

    #[test]
    fn loads_pairs_and_skips_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "# registry settings\nSVC_PUBLISH_TEST_REGISTRY=registry.local:5000\nSVC_PUBLISH_TEST_EMPTY=\n",
        )
        .unwrap();

        let env = EnvFile::load(&path).unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(
            env.get("SVC_PUBLISH_TEST_REGISTRY").as_deref(),
            Some("registry.local:5000")
        );
        assert_eq!(env.get_or("SVC_PUBLISH_TEST_EMPTY", "fallback"), "fallback");
        assert_eq!(env.get("SVC_PUBLISH_TEST_ABSENT"), None);
    }

    #[test]
    fn loaded_file_defers_to_process_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "PATH=/from/env/file\n").unwrap();

        let env = EnvFile::load(&path).unwrap();
        let expected = std::env::var("PATH").unwrap_or_else(|_| "/from/env/file".to_string());
        assert_eq!(env.get("PATH"), Some(expected));
    }

    #[test]
    fn fixed_pairs_ignore_process_env() {
        let env = EnvFile::from_pairs([("PATH", "/from/pairs")]);
        assert_eq!(env.get("PATH").as_deref(), Some("/from/pairs"));
        assert_eq!(EnvFile::default().get("PATH"), None);
    }

    #[test]
    fn substitutes_earlier_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "SVC_PUBLISH_TEST_HOST=registry.local\nSVC_PUBLISH_TEST_URL=${SVC_PUBLISH_TEST_HOST}:5000\n",
        )
        .unwrap();

        let env = EnvFile::load(&path).unwrap();
        assert_eq!(
            env.get("SVC_PUBLISH_TEST_URL").as_deref(),
            Some("registry.local:5000")
        );
    }
}

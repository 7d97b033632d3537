// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de;

use crate::StoreError;

/// The storage strategy of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetKind {
    /// Every component in a single iCalendar file
    #[default]
    File,
    /// One iCalendar file per month in a directory
    Directory,
    /// Rows of a SQLite database, replaced in one transaction per commit
    Transactional,
}

impl fmt::Display for SetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SetKind::File => "file",
            SetKind::Directory => "directory",
            SetKind::Transactional => "transactional",
        })
    }
}

/// Configuration of a set.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StoreConfig {
    /// Storage strategy.
    #[serde(default)]
    pub kind: SetKind,

    /// File, directory or database location.
    pub path: PathBuf,

    /// Write to a temporary file and rename it over the original on commit.
    #[serde(default = "default_true")]
    pub safe_save: bool,

    /// Hold an advisory lock on the storage while the set is open.
    #[serde(default = "default_true")]
    pub lock: bool,

    /// Refuse to commit changes.
    #[serde(default)]
    pub read_only: bool,

    /// Retries of a commit the database reports as busy.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between two attempts of a busy commit.
    #[serde(default)]
    pub retry_backoff: RetryBackoff,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

impl StoreConfig {
    /// A configuration with default options for `path`.
    pub fn new(kind: SetKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            safe_save: true,
            lock: true,
            read_only: false,
            max_retries: default_max_retries(),
            retry_backoff: RetryBackoff::default(),
        }
    }

    /// Parses a TOML document and normalizes it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the document is invalid or the path
    /// cannot be expanded.
    pub fn from_toml(text: &str) -> Result<Self, StoreError> {
        let mut config: StoreConfig =
            toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.normalize()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, otherwise
    /// fails like [`StoreConfig::from_toml`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        tracing::debug!(path = %path.display(), "loading store config");
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml(&text)
    }

    /// Expands `~` and environment prefixes in the path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the path is not valid UTF-8 or the
    /// home or config directory is unknown.
    pub fn normalize(&mut self) -> Result<(), StoreError> {
        self.path = expand_path(&self.path)?;
        Ok(())
    }
}

/// Pause between retries, written as `"50ms"`, `"1s"`, `"2m"` or `"1h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff(pub Duration);

impl Default for RetryBackoff {
    fn default() -> Self {
        Self(Duration::from_millis(50))
    }
}

impl<'de> serde::Deserialize<'de> for RetryBackoff {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct BackoffVisitor;

        impl de::Visitor<'_> for BackoffVisitor {
            type Value = RetryBackoff;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str(r#"a duration string like "50ms", "1s", "2m" or "1h""#)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                parse_duration(value)
                    .map(RetryBackoff)
                    .map_err(|e| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(BackoffVisitor)
    }
}

/// Handle tilde (~) and environment variables in the path
fn expand_path(path: &Path) -> Result<PathBuf, StoreError> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }

    let text = path
        .to_str()
        .ok_or_else(|| StoreError::Config(format!("invalid path {}", path.display())))?;

    let home_prefixes: &[&str] = if cfg!(unix) {
        &["~/", "$HOME/", "${HOME}/"]
    } else {
        &[r"~\", "~/", r"%UserProfile%\", r"%UserProfile%/"]
    };
    for prefix in home_prefixes {
        if let Some(stripped) = text.strip_prefix(prefix) {
            return Ok(get_home_dir()?.join(stripped));
        }
    }

    let config_prefixes: &[&str] = if cfg!(unix) {
        &["$XDG_CONFIG_HOME/", "${XDG_CONFIG_HOME}/"]
    } else {
        &[r"%LOCALAPPDATA%\", "%LOCALAPPDATA%/"]
    };
    for prefix in config_prefixes {
        if let Some(stripped) = text.strip_prefix(prefix) {
            return Ok(get_config_dir()?.join(stripped));
        }
    }

    Ok(path.to_owned())
}

fn get_home_dir() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or_else(|| StoreError::Config("home directory not found".to_string()))
}

fn get_config_dir() -> Result<PathBuf, StoreError> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(not(unix))]
    let config_dir = dirs::config_dir();
    config_dir.ok_or_else(|| StoreError::Config("config directory not found".to_string()))
}

fn parse_duration(s: &str) -> Result<Duration, StoreError> {
    let invalid = || StoreError::Config(format!("invalid duration: {s}"));
    let number = |rest: &str| rest.trim().parse::<u64>().map_err(|_| invalid());

    if let Some(rest) = s.strip_suffix("ms") {
        Ok(Duration::from_millis(number(rest)?))
    } else if let Some(rest) = s.strip_suffix('s') {
        Ok(Duration::from_secs(number(rest)?))
    } else if let Some(rest) = s.strip_suffix('m') {
        Ok(Duration::from_secs(number(rest)? * 60))
    } else if let Some(rest) = s.strip_suffix('h') {
        Ok(Duration::from_secs(number(rest)? * 3600))
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_suffixes() {
        assert_eq!(parse_duration("50ms").unwrap(), Duration::from_millis(50));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration(" 7 s").unwrap(), Duration::from_secs(7));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("12").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("ms").is_err());
    }

    #[test]
    fn test_expand_path_home() {
        let home = get_home_dir().unwrap();
        let result = expand_path(Path::new("~/calendars/work.ics")).unwrap();
        assert_eq!(result, home.join("calendars/work.ics"));
        assert!(result.is_absolute());
    }

    #[test]
    fn test_expand_path_untouched() {
        let absolute = PathBuf::from("/var/lib/almanac/set.ics");
        assert_eq!(expand_path(&absolute).unwrap(), absolute);

        let relative = PathBuf::from("relative/set.ics");
        assert_eq!(expand_path(&relative).unwrap(), relative);
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = StoreConfig::from_toml(r#"path = "/tmp/set.ics""#).unwrap();
        assert_eq!(config.kind, SetKind::File);
        assert!(config.safe_save);
        assert!(config.lock);
        assert!(!config.read_only);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff, RetryBackoff(Duration::from_millis(50)));
    }

    #[test]
    fn test_from_toml_full() {
        let config = StoreConfig::from_toml(
            r#"
kind = "transactional"
path = "/tmp/set.db"
safe_save = false
lock = false
read_only = true
max_retries = 5
retry_backoff = "1s"
"#,
        )
        .unwrap();
        assert_eq!(config.kind, SetKind::Transactional);
        assert!(!config.safe_save);
        assert!(!config.lock);
        assert!(config.read_only);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_backoff.0, Duration::from_secs(1));
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        let err = StoreConfig::from_toml("path = \"x\"\nkind = \"heap\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));

        let err = StoreConfig::from_toml("path = \"x\"\nretry_backoff = \"soon\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}

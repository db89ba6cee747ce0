//! Configuration loading and resolution.
//!
//! Settings come from two places: a key/value settings file (`.env` syntax)
//! and the process environment. Both are read once into plain maps and merged
//! by [`Settings::resolve`], with the environment taking precedence. The
//! process environment is never modified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{OpsError, Result};

/// Default settings file name, looked up in the working directory and then
/// next to the executable.
pub const DEFAULT_SETTINGS_FILE: &str = ".env";

/// Immutable, merged view of every named setting.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl Settings {
    /// Merge an environment snapshot with parsed settings-file pairs.
    ///
    /// Environment values override file values. Empty environment values do
    /// not shadow a non-empty file value.
    pub fn resolve<E, F>(env: E, file: F) -> Self
    where
        E: IntoIterator<Item = (String, String)>,
        F: IntoIterator<Item = (String, String)>,
    {
        let mut values: BTreeMap<String, String> = file.into_iter().collect();
        for (key, value) in env {
            if value.trim().is_empty() && values.contains_key(&key) {
                continue;
            }
            values.insert(key, value);
        }
        Self {
            values,
            source: None,
        }
    }

    /// Record which settings file contributed to these values.
    pub fn with_source(mut self, path: PathBuf) -> Self {
        self.source = Some(path);
        self
    }

    /// The settings file that was read, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Value of `key`, treating blank values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Value of `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// First present value among `keys`, in order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Parse a boolean flag (`1`, `true`, `yes`, `on`), `default` when absent.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => default,
        }
    }

    /// Fail with every absent key listed if any of `keys` is missing.
    pub fn require(&self, keys: &[&str]) -> Result<()> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|k| self.get(k).is_none())
            .map(|k| k.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(OpsError::MissingConfig { missing })
        }
    }
}

/// Parse a `.env`-style settings file into ordered key/value pairs.
pub fn read_settings_file(path: &Path) -> Result<Vec<(String, String)>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        OpsError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
    })?;
    iter.map(|item| {
        item.map_err(|e| OpsError::InvalidConfig(format!("{}: {e}", path.display())))
    })
    .collect()
}

/// Locate the settings file to read.
///
/// An explicit path must exist. Without one, `.env` in the working directory
/// is preferred, then `.env` next to the running executable; finding neither
/// is not an error.
pub fn find_settings_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(OpsError::InvalidConfig(format!(
            "settings file not found: {}",
            path.display()
        )));
    }

    let cwd = PathBuf::from(DEFAULT_SETTINGS_FILE);
    if cwd.is_file() {
        return Ok(Some(cwd));
    }

    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_SETTINGS_FILE)));
    Ok(beside_exe.filter(|p| p.is_file()))
}

/// Load settings from the process environment and the settings file.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let env: Vec<(String, String)> = std::env::vars().collect();
    match find_settings_file(explicit)? {
        Some(path) => {
            let file = read_settings_file(&path)?;
            tracing::debug!(path = %path.display(), keys = file.len(), "read settings file");
            Ok(Settings::resolve(env, file).with_source(path))
        }
        None => {
            tracing::debug!("no settings file found, using environment only");
            Ok(Settings::resolve(env, Vec::new()))
        }
    }
}

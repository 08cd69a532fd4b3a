//! Merged multi-scope configuration view.

use std::path::{Path, PathBuf};

use bstr::{BStr, ByteSlice};

use crate::error::ConfigError;
use crate::file::ConfigFile;
use crate::{ConfigEntry, ConfigKey, ConfigScope};

/// Merged configuration from all scopes.
pub struct ConfigSet {
    /// Config files in precedence order (low to high).
    files: Vec<ConfigFile>,
}

impl ConfigSet {
    /// Create an empty config set.
    pub fn new() -> Self {
        ConfigSet { files: Vec::new() }
    }

    /// Load the standard config file hierarchy for a repository.
    ///
    /// Loads in order: system, global, local. Identity (`user.name`,
    /// `user.email`) and merge settings are read through this hierarchy with
    /// no environment-variable or system-user fallback.
    pub fn load(git_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut set = ConfigSet::new();

        let system_path = PathBuf::from("/etc/gitconfig");
        if system_path.exists() {
            match ConfigFile::load(&system_path, ConfigScope::System) {
                Ok(file) => set.add_file(file),
                Err(ConfigError::FileNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(home) = std::env::var_os("HOME") {
            let global_path = PathBuf::from(home).join(".gitconfig");
            if global_path.exists() {
                match ConfigFile::load(&global_path, ConfigScope::Global) {
                    Ok(file) => set.add_file(file),
                    Err(ConfigError::FileNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        if let Some(git_dir) = git_dir {
            let local_path = git_dir.join("config");
            if local_path.exists() {
                match ConfigFile::load(&local_path, ConfigScope::Local) {
                    Ok(file) => set.add_file(file),
                    Err(ConfigError::FileNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(set)
    }

    /// Add a config file at the given scope.
    pub fn add_file(&mut self, file: ConfigFile) {
        self.files.push(file);
    }

    /// Get the highest-priority value as a string.
    pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let config_key = ConfigKey::parse(key)?;
        for file in self.files.iter().rev() {
            if let Some(value) = file.get(&config_key) {
                return Ok(value.map(|v| v.to_str_lossy().to_string()));
            }
        }
        Ok(None)
    }

    /// Get all values for a multi-valued key, across all scopes (low to high).
    pub fn get_all_strings(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        let config_key = ConfigKey::parse(key)?;
        let mut results = Vec::new();
        for file in &self.files {
            for value in file.get_all(&config_key) {
                results.push(
                    value
                        .map(|v| v.to_str_lossy().to_string())
                        .unwrap_or_default(),
                );
            }
        }
        Ok(results)
    }

    /// Get as boolean.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let config_key = ConfigKey::parse(key)?;
        for file in self.files.iter().rev() {
            if let Some(value) = file.get(&config_key) {
                return Ok(Some(parse_bool(value)?));
            }
        }
        Ok(None)
    }

    /// Get as boolean with default.
    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        Ok(self.get_bool(key)?.unwrap_or(default))
    }

    /// Get the scope of the highest-priority value.
    pub fn get_scope(&self, key: &str) -> Option<ConfigScope> {
        let config_key = ConfigKey::parse(key).ok()?;
        for file in self.files.iter().rev() {
            if file.get(&config_key).is_some() {
                return Some(file.scope());
            }
        }
        None
    }

    /// Set a value in the config file for the given scope.
    pub fn set(&mut self, key: &str, value: &str, scope: ConfigScope) -> Result<(), ConfigError> {
        let config_key = ConfigKey::parse(key)?;
        let value_bstr = BStr::new(value.as_bytes());

        for file in &mut self.files {
            if file.scope() == scope {
                file.set(&config_key, value_bstr);
                if let Some(path) = file.path() {
                    let path = path.to_path_buf();
                    file.write_to(&path)?;
                }
                return Ok(());
            }
        }

        Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no config file loaded for scope {:?}", scope),
        )))
    }

    /// Remove a key from the given scope.
    pub fn remove(&mut self, key: &str, scope: ConfigScope) -> Result<bool, ConfigError> {
        let config_key = ConfigKey::parse(key)?;

        for file in &mut self.files {
            if file.scope() == scope {
                let removed = file.remove(&config_key);
                if removed {
                    if let Some(path) = file.path() {
                        let path = path.to_path_buf();
                        file.write_to(&path)?;
                    }
                }
                return Ok(removed);
            }
        }

        Ok(false)
    }

    /// Return all entries across all scopes in precedence order (low to high).
    pub fn all_entries(&self) -> Vec<ConfigEntry> {
        let mut entries = Vec::new();
        for file in &self.files {
            entries.extend(file.entries());
        }
        entries
    }

    /// Get all loaded files.
    pub fn files(&self) -> &[ConfigFile] {
        &self.files
    }

    /// Get mutable access to all files.
    pub fn files_mut(&mut self) -> &mut Vec<ConfigFile> {
        &mut self.files
    }
}

impl Default for ConfigSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSet")
            .field("files_count", &self.files.len())
            .finish()
    }
}

/// Parse a config boolean: empty/no value, "true"/"yes"/"on"/"1" are true,
/// "false"/"no"/"off"/"0" are false (case-insensitive).
fn parse_bool(value: Option<&BStr>) -> Result<bool, ConfigError> {
    let value = match value {
        None => return Ok(true),
        Some(v) => v,
    };
    let lower = value.to_str_lossy().to_ascii_lowercase();
    match lower.as_str() {
        "true" | "yes" | "on" | "1" | "" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(ConfigError::InvalidBool(other.to_string())),
    }
}

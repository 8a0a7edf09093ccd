use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use dirs::{data_dir, home_dir};
use serde::{Deserialize, Serialize};

const APP_DIR_NAME: &str = ".recipe_chat";
const DATA_DIR_NAME: &str = "recipe_chat";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Roughly what browsers grant a single origin.
pub const DEFAULT_STORAGE_QUOTA: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the Recipe Finder server exposing `/chatbot`
    pub server_url: String,
    /// Persist and replay the conversation between runs
    pub history_enabled: bool,
    /// Directory holding per-origin storage files (defaults to the user data dir)
    pub storage_dir: Option<String>,
    /// Byte limit for one origin's storage area; `0` disables the check
    pub storage_quota_bytes: usize,
    /// Request timeout; unset means wait for the server indefinitely
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            history_enabled: true,
            storage_dir: None,
            storage_quota_bytes: DEFAULT_STORAGE_QUOTA,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn load_with(project_root: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(project_root, explicit)?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let value: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config TOML at {}", path.display()))?;
        Ok(value)
    }

    pub fn save_with(&self, project_root: Option<&Path>, explicit: Option<&Path>) -> Result<()> {
        let (dir, path) = resolve_config_dir_and_file(project_root, explicit)?;
        if !dir.exists() {
            fs::create_dir_all(&dir).with_context(|| format!(
                "Failed to create config directory at {}",
                dir.display()
            ))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(())
    }

    pub fn init_scoped(force: bool, project_root: Option<&Path>, explicit: Option<&Path>) -> Result<PathBuf> {
        let (_, file) = resolve_config_dir_and_file(project_root, explicit)?;
        if file.exists() && !force {
            anyhow::bail!("Config already exists at {} (use --force to overwrite)", file.display());
        }
        Self::default().save_with(project_root, explicit)?;
        Ok(file)
    }

    /// Applies a `config set` pair. Returns `false` for unknown keys.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "server-url" | "server_url" => self.server_url = value.trim().to_owned(),
            "history" | "history-enabled" | "history_enabled" => {
                self.history_enabled = parse_bool(value)
                    .with_context(|| format!("Expected true/false for {}, got {:?}", key, value))?;
            }
            "storage-dir" | "storage_dir" => self.storage_dir = non_empty(value),
            "storage-quota" | "storage_quota_bytes" => {
                self.storage_quota_bytes = parse_optional::<usize>(value)
                    .with_context(|| format!("Expected a byte count for {}, got {:?}", key, value))?
                    .unwrap_or(0);
            }
            "timeout" | "request_timeout_secs" => {
                self.request_timeout_secs = parse_optional(value)
                    .with_context(|| format!("Expected seconds for {}, got {:?}", key, value))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub fn storage_quota(&self) -> Option<usize> {
        (self.storage_quota_bytes > 0).then_some(self.storage_quota_bytes)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    pub fn resolve_storage_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage_dir {
            return Ok(PathBuf::from(dir));
        }
        let base = data_dir()
            .or_else(home_dir)
            .context("Cannot resolve a data directory for chat history")?;
        Ok(base.join(DATA_DIR_NAME).join("storage"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_optional<T: std::str::FromStr>(value: &str) -> Option<Option<T>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    value.parse().ok().map(Some)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn config_dir_path() -> Result<PathBuf> {
    let home = home_dir().context("Cannot resolve home directory")?;
    Ok(home.join(APP_DIR_NAME))
}

fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir_path()?.join(CONFIG_FILE_NAME))
}

fn resolve_config_path(project_root: Option<&Path>, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit { return Ok(p.to_path_buf()); }
    if let Some(root) = project_root { return Ok(root.join(CONFIG_FILE_NAME)); }
    config_file_path()
}

fn resolve_config_dir_and_file(project_root: Option<&Path>, explicit: Option<&Path>) -> Result<(PathBuf, PathBuf)> {
    if let Some(p) = explicit {
        let dir = p.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        return Ok((dir.to_path_buf(), p.to_path_buf()));
    }
    if let Some(root) = project_root {
        return Ok((root.to_path_buf(), root.join(CONFIG_FILE_NAME)));
    }
    let dir = config_dir_path()?;
    Ok((dir.clone(), dir.join(CONFIG_FILE_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_with(Some(dir.path()), None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load_project_scope() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.set_value("server-url", "http://recipes.local:8000").unwrap();
        settings.set_value("history", "off").unwrap();
        settings.set_value("timeout", "15").unwrap();
        settings.save_with(Some(dir.path()), None).unwrap();

        let loaded = Settings::load_with(Some(dir.path()), None).unwrap();
        assert_eq!(loaded.server_url, "http://recipes.local:8000");
        assert!(!loaded.history_enabled);
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "server_url = \"http://example.test\"\n").unwrap();
        let settings = Settings::load_with(None, Some(&path)).unwrap();
        assert_eq!(settings.server_url, "http://example.test");
        assert!(settings.history_enabled);
        assert_eq!(settings.storage_quota(), Some(DEFAULT_STORAGE_QUOTA));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        Settings::init_scoped(false, Some(dir.path()), None).unwrap();
        assert!(Settings::init_scoped(false, Some(dir.path()), None).is_err());
        assert!(Settings::init_scoped(true, Some(dir.path()), None).is_ok());
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(settings.set_value("history", "maybe").is_err());
        assert!(!settings.set_value("colour", "blue").unwrap());
        settings.set_value("storage-quota", "none").unwrap();
        assert_eq!(settings.storage_quota(), None);
    }

    #[test]
    fn test_unlimited_quota_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.set_value("storage-quota", "none").unwrap();
        settings.save_with(Some(dir.path()), None).unwrap();

        let loaded = Settings::load_with(Some(dir.path()), None).unwrap();
        assert_eq!(loaded.storage_quota_bytes, 0);
        assert_eq!(loaded.storage_quota(), None);

        let mut settings = loaded;
        settings.set_value("storage-quota", "2048").unwrap();
        settings.save_with(Some(dir.path()), None).unwrap();
        let loaded = Settings::load_with(Some(dir.path()), None).unwrap();
        assert_eq!(loaded.storage_quota(), Some(2048));
    }
}

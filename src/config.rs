use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use url::Url;

const APP_DIR: &str = ".DayTracker";
const CONFIG_FILE: &str = "config.json";
const API_KEY_ENV: &str = "DAYTRACKER_API_KEY";
const BACKEND_URL_ENV: &str = "DAYTRACKER_BACKEND_URL";
pub const FIXED_REMINDER_POLL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub backend_api_key: Option<String>,
    pub backend_timeout_seconds: u64,
    pub cache_path: PathBuf,
    pub api_port: u16,
    pub notify_reminders: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            backend_api_key: None,
            backend_timeout_seconds: 15,
            cache_path: default_root_dir().join("cache").join("snapshot.db"),
            api_port: 7891,
            notify_reminders: true,
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_dirs(&self) -> Result<()> {
        let root = default_root_dir();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        Ok(())
    }

    /// Environment wins over the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                self.backend_api_key
                    .clone()
                    .filter(|value| !value.trim().is_empty())
            })
    }

    pub fn resolve_backend_url(&self) -> Result<String> {
        let raw = std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.backend_url.clone());

        if raw.trim().is_empty() {
            bail!(
                "Backend URL is missing. Run `DayTracker onboard` or `DayTracker config set backend.url <URL>`."
            );
        }

        Ok(normalize_backend_url(&raw))
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "backend_url" => {
                let normalized = normalize_backend_url(value);
                Url::parse(&normalized)
                    .with_context(|| format!("backend_url must be an absolute URL: {value}"))?;
                self.backend_url = normalized;
            }
            "backend_api_key" => {
                self.backend_api_key = (!value.trim().is_empty()).then_some(value.trim().to_string());
            }
            "backend_timeout_seconds" => {
                self.backend_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("backend_timeout_seconds must be a number"))?
                    .max(3);
            }
            "cache_path" => {
                self.cache_path = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "notify_reminders" => {
                self.notify_reminders = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("notify_reminders must be true/false"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: backend_url|backend.url, backend_api_key|backend.api_key, backend_timeout_seconds|backend.timeout_seconds, cache_path|cache.path, api_port|api.port, notify_reminders|reminders.notify"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "backend_url" => Some(self.backend_url.clone()),
            "backend_api_key" => Some(
                self.backend_api_key
                    .as_ref()
                    .map(|_| "***set***".to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "backend_timeout_seconds" => Some(self.backend_timeout_seconds.to_string()),
            "cache_path" => Some(self.cache_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "notify_reminders" => Some(self.notify_reminders.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "backend_url" | "backend.url" => "backend_url",
        "backend_api_key" | "backend.api_key" => "backend_api_key",
        "backend_timeout_seconds" | "backend.timeout_seconds" => "backend_timeout_seconds",
        "cache_path" | "cache.path" => "cache_path",
        "api_port" | "api.port" => "api_port",
        "notify_reminders" | "reminders.notify" => "notify_reminders",
        _ => key,
    }
}

fn normalize_backend_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn dotted_keys_map_to_fields() {
        let mut config = Config::default();
        config
            .set_value("backend.url", " https://demo.supabase.co/ ")
            .expect("url accepted");
        config.set_value("api.port", "9000").expect("port accepted");
        config
            .set_value("reminders.notify", "false")
            .expect("notify accepted");

        assert_eq!(config.backend_url, "https://demo.supabase.co");
        assert_eq!(config.get_value("api_port").as_deref(), Some("9000"));
        assert!(!config.notify_reminders);
    }

    #[test]
    fn api_key_is_masked_on_read() {
        let mut config = Config::default();
        assert_eq!(config.get_value("backend.api_key").as_deref(), Some("not_set"));

        config
            .set_value("backend.api_key", "secret-anon-key")
            .expect("key accepted");
        assert_eq!(config.get_value("backend.api_key").as_deref(), Some("***set***"));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set_value("backend.url", "not a url").is_err());
        assert!(config.set_value("api.port", "seventy").is_err());
        assert!(config.set_value("reminders.poll_seconds", "60").is_err());
        assert!(config.set_value("unknown.key", "1").is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.backend_url = "https://demo.supabase.co".to_string();
        config.save_to(&path).expect("saved");

        let loaded = Config::load_from(&path).expect("loaded");
        assert_eq!(loaded.backend_url, "https://demo.supabase.co");
        assert!(loaded.get_value("reminders.poll_seconds").is_none());
    }

    #[test]
    fn older_config_with_poll_interval_still_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"backend_url":"https://demo.supabase.co","reminder_poll_seconds":60}"#,
        )
        .expect("written");

        let loaded = Config::load_from(&path).expect("loaded");
        assert_eq!(loaded.backend_url, "https://demo.supabase.co");
        assert_eq!(loaded.api_port, 7891);
    }
}

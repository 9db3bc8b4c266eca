//! Configuration management for tutorbot
//!
//! Stores settings in ~/.config/tutorbot/config.json

use crate::keyring;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tutorbot_engine::llm::models::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use tutorbot_engine::llm::ModelSettings;
use url::Url;

/// Overrides the directory holding config.json.
pub const CONFIG_DIR_ENV: &str = "TUTORBOT_CONFIG_DIR";

/// Environment fallbacks for the API key, checked in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["TUTORBOT_API_KEY", "GROQ_API_KEY", "VITE_GROQ_API_KEY"];

const MAX_TEMPERATURE: f32 = 2.0;
const MAX_TOKENS_CEILING: u32 = 8192;
const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            data_dir: None,
        }
    }
}

impl Config {
    fn sanitize(&mut self) {
        if !self.temperature.is_finite() {
            self.temperature = DEFAULT_TEMPERATURE;
        }
        self.temperature = self.temperature.clamp(0.0, MAX_TEMPERATURE);
        self.max_tokens = self.max_tokens.clamp(1, MAX_TOKENS_CEILING);
        self.request_timeout_secs = self
            .request_timeout_secs
            .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);

        if self.model.trim().is_empty() {
            self.model = DEFAULT_MODEL.to_string();
        }
        if !endpoint_allowed(&self.endpoint) {
            log::warn!("ignoring configured endpoint; falling back to the default");
            self.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        if matches!(&self.data_dir, Some(dir) if dir.as_os_str().is_empty()) {
            self.data_dir = None;
        }
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        dirs::config_dir().map(|p| p.join("tutorbot"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Config>(&content) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(err) => {
                preserve_corrupt_config(path, &content);
                log::warn!(
                    "config file was corrupted ({}); a backup was saved and defaults were loaded",
                    err
                );
                Self::default()
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut sanitized = self.clone();
        sanitized.sanitize();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                    log::warn!("failed to set config directory permissions: {}", e);
                }
            }
        }

        let content =
            serde_json::to_string_pretty(&sanitized).context("Failed to serialize config")?;
        write_config_atomic(path, &content).context("Failed to write config")
    }

    /// Settings handed to the completion gateway.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.request_timeout_secs,
        }
    }

    /// Where sessions, registrations and logs live.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .map(|p| p.join("tutorbot"))
            .ok_or_else(|| anyhow!("Could not determine data directory"))
    }

    /// Get the API key (keyring first, environment fallback).
    pub fn get_api_key(&self) -> Option<String> {
        match keyring::get_api_key() {
            Ok(Some(key)) if !key.trim().is_empty() => return Some(key),
            Ok(_) => {}
            Err(err) => keyring::warn_keychain_error_once("API key", &err),
        }
        api_key_from_env()
    }

    /// Set and save the API key
    pub fn set_api_key(&self, key: &str) -> Result<()> {
        let store = keyring::credentials_store_label();
        keyring::set_api_key(key).with_context(|| {
            format!(
                "Failed to store API key in {}. You can set the TUTORBOT_API_KEY environment variable instead",
                store
            )
        })?;

        // Read back so a silently dropped write is caught here.
        match keyring::get_api_key() {
            Ok(Some(stored)) if stored == key => self.save(),
            Ok(Some(_)) => bail!("API key verification failed: stored key doesn't match in {}", store),
            Ok(None) => bail!("API key verification failed: key was not persisted to {}", store),
            Err(err) => Err(err.context(format!(
                "API key verification failed: couldn't read back from {}",
                store
            ))),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }

    /// A key is usable when non-empty; Groq keys start with `gsk_`.
    pub fn validate_api_key_format(key: &str) -> bool {
        let key = key.trim();
        !key.is_empty() && key.starts_with("gsk_")
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/tutorbot/config.json".to_string())
    }
}

fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// `https` anywhere, or plain `http` only to the local machine.
pub fn endpoint_allowed(endpoint: &str) -> bool {
    let Ok(url) = Url::parse(endpoint.trim()) else {
        return false;
    };
    match url.scheme() {
        "https" => url.host_str().is_some(),
        "http" => matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")),
        _ => false,
    }
}

/// Interactive prompt to set up API key
pub fn setup_api_key_interactive() -> Result<String> {
    use std::io;

    println!();
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  TUTORBOT SETUP                                         │");
    println!("  └─────────────────────────────────────────────────────────┘");
    println!();
    println!("  TutorBot uses Groq to write summaries, flashcards and quizzes.");
    println!();
    println!("  Steps:");
    println!("    1) Create a key at https://console.groq.com/keys");
    println!("    2) Paste the key below and press Enter");
    println!();
    println!("  Data use notice: your study material is sent to Groq to generate");
    println!("  study aids. Sessions stay on this machine as plain JSON.");
    println!();
    println!(
        "  We'll store the key in your {}.",
        keyring::credentials_store_label()
    );
    println!("  Prefer env vars? Set TUTORBOT_API_KEY and rerun.");
    println!();
    print!("  API Key: ");
    io::stdout().flush()?;

    let mut key = String::new();
    io::stdin().read_line(&mut key)?;
    let key = key.trim().to_string();

    if key.is_empty() {
        bail!("No API key provided");
    }

    if !Config::validate_api_key_format(&key) {
        println!();
        println!("  Warning: Key doesn't look like a Groq key (usually starts with gsk_)");
        println!("     Saving anyway...");
    }

    let config = Config::load();
    config.set_api_key(&key)?;

    println!();
    println!("  + API key saved. Settings live in {}", Config::config_location());
    println!();

    Ok(key)
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn write_config_atomic(path: &Path, content: &str) -> Result<()> {
    use std::fs::OpenOptions;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            log::warn!("failed to set temp config file permissions: {}", e);
        }
    }

    file.write_all(content.as_bytes())?;
    drop(file);

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_matches_model_defaults() {
        let config = Config::default();
        assert_eq!(config.model_settings(), ModelSettings::default());
        let encoded = serde_json::to_string(&config).unwrap();
        assert!(!encoded.contains("data_dir"));
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"model":"llama3-70b-8192"}"#).unwrap();
        assert_eq!(parsed.model, "llama3-70b-8192");
        assert_eq!(parsed.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(parsed.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_sanitize_clamps_ranges() {
        let mut config = Config {
            temperature: 9.0,
            max_tokens: 0,
            request_timeout_secs: 1,
            ..Config::default()
        };
        config.sanitize();
        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.max_tokens, 1);
        assert_eq!(config.request_timeout_secs, 5);

        config.max_tokens = 100_000;
        config.request_timeout_secs = 10_000;
        config.temperature = f32::NAN;
        config.sanitize();
        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.request_timeout_secs, 300);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(endpoint_allowed(DEFAULT_ENDPOINT));
        assert!(endpoint_allowed("http://localhost:8080/v1/chat/completions"));
        assert!(endpoint_allowed("http://127.0.0.1:11434/v1/chat/completions"));
        assert!(!endpoint_allowed("http://example.com/v1"));
        assert!(!endpoint_allowed("ftp://example.com"));
        assert!(!endpoint_allowed("not a url"));

        let mut config = Config {
            endpoint: "http://evil.example/v1".to_string(),
            ..Config::default()
        };
        config.sanitize();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorbot").join("config.json");
        let config = Config {
            model: "mixtral-8x7b-32768".to_string(),
            temperature: 0.2,
            data_dir: Some(dir.path().join("data")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_corrupt_config_is_preserved_and_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
        assert!(!path.exists());
        let backup = fs::read_to_string(dir.path().join("config.json.corrupt")).unwrap();
        assert_eq!(backup, "{ not json");
    }

    #[test]
    fn test_missing_config_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Config::load_from(&dir.path().join("absent.json")),
            Config::default()
        );
    }

    #[test]
    fn test_api_key_format() {
        assert!(Config::validate_api_key_format("gsk_abc123"));
        assert!(Config::validate_api_key_format("  gsk_abc123 \n"));
        assert!(!Config::validate_api_key_format("sk-abc"));
        assert!(!Config::validate_api_key_format("   "));
    }
}

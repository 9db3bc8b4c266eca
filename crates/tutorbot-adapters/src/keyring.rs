//! Credential storage for the completion API key.
//!
//! The key lives in one JSON keychain entry. When the keychain is disabled
//! (or already bypassed by a populated credentials file) a 0600 file under
//! the config directory is used instead.

use anyhow::{anyhow, Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

const KEYRING_SERVICE: &str = "tutorbot-credentials";
const KEYRING_USERNAME: &str = "default";

/// Set to `1`/`true`/`yes` to keep everything in the credentials file.
pub const DISABLE_KEYRING_ENV: &str = "TUTORBOT_DISABLE_KEYRING";

/// Overrides the credentials file location.
pub const CREDENTIALS_FILE_ENV: &str = "TUTORBOT_CREDENTIALS_FILE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

static CREDENTIALS_CACHE: OnceLock<Mutex<Option<StoredCredentials>>> = OnceLock::new();
static KEYRING_ERROR_WARNED: AtomicBool = AtomicBool::new(false);

fn credentials_cache() -> &'static Mutex<Option<StoredCredentials>> {
    CREDENTIALS_CACHE.get_or_init(|| Mutex::new(None))
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name)
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str(),
        "1" | "true" | "yes"
    )
}

fn keyring_disabled() -> bool {
    if cfg!(test) || env_flag(DISABLE_KEYRING_ENV) {
        return true;
    }

    // A populated credentials file wins so the keychain is never prompted.
    matches!(read_fallback_credentials(), Ok(creds) if creds.api_key.is_some())
}

/// Human-friendly credential backend label used in CLI messages.
pub fn credentials_store_label() -> &'static str {
    if keyring_disabled() {
        "local credentials file"
    } else {
        "system keychain"
    }
}

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
}

fn fallback_credentials_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CREDENTIALS_FILE_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if cfg!(test) {
        return Ok(std::env::temp_dir().join("tutorbot-test-credentials.json"));
    }

    dirs::config_dir()
        .map(|p| p.join("tutorbot").join("credentials.json"))
        .ok_or_else(|| anyhow!("Could not determine credentials file path"))
}

fn read_fallback_credentials() -> Result<StoredCredentials> {
    let path = fallback_credentials_path()?;
    if !path.exists() {
        return Ok(StoredCredentials::default());
    }
    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read credentials file '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse credentials file '{}'", path.display()))
}

fn write_fallback_credentials(creds: &StoredCredentials) -> Result<()> {
    let path = fallback_credentials_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "Failed to create credentials directory '{}'",
                parent.display()
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    let content = serde_json::to_string(creds).context("Failed to serialize credentials")?;
    let tmp_path = path.with_extension("json.tmp");
    let mut tmp_file = fs::File::create(&tmp_path).with_context(|| {
        format!(
            "Failed to create temp credentials file '{}'",
            tmp_path.display()
        )
    })?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = tmp_file.set_permissions(fs::Permissions::from_mode(0o600));
    }
    tmp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write credentials file '{}'", tmp_path.display()))?;
    drop(tmp_file);
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("Failed to finalize credentials file '{}'", path.display()))?;
    Ok(())
}

/// Warn about keychain errors only once per process.
pub fn warn_keychain_error_once(context: &str, err: &anyhow::Error) {
    if KEYRING_ERROR_WARNED.swap(true, Ordering::Relaxed) {
        return;
    }
    log::warn!("couldn't access system keychain for {}: {:#}", context, err);
    log::warn!(
        "set {}=1 to use a local credentials file, or set TUTORBOT_API_KEY",
        DISABLE_KEYRING_ENV
    );
}

fn read_credentials_uncached() -> Result<StoredCredentials> {
    if keyring_disabled() {
        return read_fallback_credentials();
    }
    let entry = keyring_entry()?;
    match entry.get_password() {
        Ok(json) => serde_json::from_str(&json).context("Failed to parse stored credentials"),
        Err(keyring::Error::NoEntry) => Ok(StoredCredentials::default()),
        Err(err) => Err(err.into()),
    }
}

fn write_credentials(creds: &StoredCredentials) -> Result<()> {
    if keyring_disabled() {
        return write_fallback_credentials(creds);
    }
    let entry = keyring_entry()?;
    let json = serde_json::to_string(creds).context("Failed to serialize credentials")?;
    entry.set_password(&json)?;
    Ok(())
}

fn read_credentials_cached() -> Result<StoredCredentials> {
    let mut guard = credentials_cache()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(creds) = guard.as_ref() {
        return Ok(creds.clone());
    }

    let creds = read_credentials_uncached()?;
    *guard = Some(creds.clone());
    Ok(creds)
}

fn update_cache(creds: StoredCredentials) {
    let mut guard = credentials_cache()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(creds);
}

#[cfg(test)]
pub(crate) fn reset_for_tests() {
    let mut guard = credentials_cache()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = None;
    KEYRING_ERROR_WARNED.store(false, Ordering::Relaxed);
}

// ============================================================================
// Public API
// ============================================================================

pub fn get_api_key() -> Result<Option<String>> {
    Ok(read_credentials_cached()?.api_key)
}

pub fn set_api_key(key: &str) -> Result<()> {
    let mut creds = read_credentials_cached().unwrap_or_default();
    creds.api_key = Some(key.to_string());
    write_credentials(&creds)?;
    update_cache(creds);
    Ok(())
}

pub fn clear_api_key() -> Result<()> {
    let mut creds = read_credentials_cached().unwrap_or_default();
    creds.api_key = None;
    write_credentials(&creds)?;
    update_cache(creds);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_credentials_skip_empty_key() {
        let json = serde_json::to_string(&StoredCredentials::default()).unwrap();
        assert_eq!(json, "{}");
        let parsed: StoredCredentials = serde_json::from_str(r#"{"api_key": "gsk_x"}"#).unwrap();
        assert_eq!(parsed.api_key.as_deref(), Some("gsk_x"));
    }

    #[test]
    fn test_credentials_store_label_uses_file_backend_in_tests() {
        assert_eq!(credentials_store_label(), "local credentials file");
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::env::set_var(CREDENTIALS_FILE_ENV, &path);
        reset_for_tests();

        assert_eq!(get_api_key().unwrap(), None);
        set_api_key("gsk_test_key").unwrap();
        assert_eq!(get_api_key().unwrap(), Some("gsk_test_key".to_string()));

        reset_for_tests();
        assert_eq!(get_api_key().unwrap(), Some("gsk_test_key".to_string()));

        clear_api_key().unwrap();
        reset_for_tests();
        assert_eq!(get_api_key().unwrap(), None);

        std::env::remove_var(CREDENTIALS_FILE_ENV);
        reset_for_tests();
    }
}

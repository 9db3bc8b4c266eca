//! Local persistence for sessions, registrations and the capped logs.
//!
//! Every key is one JSON file (`tutorbot_<key>.json`) in the data directory.
//! Writes replace the whole value through a temp file and rename, under an
//! advisory lock shared by every key in the directory. Values are plain JSON:
//! nothing stored here is confidential.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tutorbot_core::exam::{ExamProgress, ExamRegistration};
use tutorbot_core::session::StudySession;
use tutorbot_engine::llm::sanitize_api_response;

pub const KEY_PREFIX: &str = "tutorbot_";

pub const SESSIONS_KEY: &str = "sessions";
pub const REGISTRATIONS_KEY: &str = "exam_registrations";
pub const ANALYTICS_KEY: &str = "analytics";
pub const ERROR_LOG_KEY: &str = "errors";

pub const ANALYTICS_CAP: usize = 100;
pub const ERROR_LOG_CAP: usize = 50;

const LOCK_FILE: &str = ".tutorbot.lock";
const LOCK_TIMEOUT_SECS: u64 = 5;
const LOCK_RETRY_MS: u64 = 50;

/// One usage event in the analytics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Redacted failure record. Never carries study content or credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

struct StoreLock {
    file: fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Bytes outside `[A-Za-z0-9_-]` become `%XX`, so distinct keys never
    /// share a file and no key can leave the data directory.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut safe = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                safe.push(byte as char);
            } else {
                safe.push_str(&format!("%{:02X}", byte));
            }
        }
        self.dir.join(format!("{}{}.json", KEY_PREFIX, safe))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).with_context(|| {
                format!("Failed to create data directory '{}'", self.dir.display())
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700));
            }
        }
        Ok(())
    }

    fn lock(&self, exclusive: bool) -> Result<StoreLock> {
        self.ensure_dir()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE))?;

        let start = Instant::now();
        loop {
            let result = if exclusive {
                FileExt::try_lock_exclusive(&file)
            } else {
                FileExt::try_lock_shared(&file)
            };
            match result {
                Ok(()) => break,
                Err(err) => {
                    if err.kind() != ErrorKind::WouldBlock {
                        return Err(err.into());
                    }
                    if start.elapsed() >= Duration::from_secs(LOCK_TIMEOUT_SECS) {
                        return Err(anyhow!(
                            "Timed out waiting for store lock ({}s)",
                            LOCK_TIMEOUT_SECS
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_MS));
                }
            }
        }

        Ok(StoreLock { file })
    }

    fn read_unlocked<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse stored value '{}'", key))?;
        Ok(Some(value))
    }

    fn get_unlocked<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.read_unlocked(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                log::warn!("unreadable stored value '{}': {:#}", key, err);
                default
            }
        }
    }

    fn write_unlocked<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let content = serde_json::to_string(value)?;
        write_atomic(&self.path_for(key), &content)
    }

    /// Stored value for `key`, or `default` when missing or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        if !self.path_for(key).exists() {
            return default;
        }
        match self.lock(false) {
            Ok(_lock) => self.get_unlocked(key, default),
            Err(err) => {
                log::warn!("couldn't lock store to read '{}': {:#}", key, err);
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let _lock = self.lock(true)?;
        self.write_unlocked(key, value)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let _lock = self.lock(true)?;
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove every stored key. Returns how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let _lock = self.lock(true)?;
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_ours = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(KEY_PREFIX) && n.ends_with(".json"));
            if is_ours {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        log::info!("cleared {} stored keys", removed);
        Ok(removed)
    }

    /// Append to a list under `key`, dropping the oldest entries beyond `cap`.
    pub fn append_capped<T>(&self, key: &str, record: T, cap: usize) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let _lock = self.lock(true)?;
        let mut records: Vec<T> = self.get_unlocked(key, Vec::new());
        records.push(record);
        if records.len() > cap {
            let excess = records.len() - cap;
            records.drain(..excess);
        }
        self.write_unlocked(key, &records)
    }

    pub fn track(&self, action: &str, data: serde_json::Value) -> Result<()> {
        let event = AnalyticsEvent {
            action: action.to_string(),
            data,
            timestamp: Utc::now(),
        };
        self.append_capped(ANALYTICS_KEY, event, ANALYTICS_CAP)
    }

    pub fn analytics(&self) -> Vec<AnalyticsEvent> {
        self.get(ANALYTICS_KEY, Vec::new())
    }

    /// Record a failure with its message redacted.
    pub fn log_error(&self, message: &str, context: &str) -> Result<()> {
        let record = ErrorRecord {
            message: sanitize_api_response(message),
            context: context.to_string(),
            timestamp: Utc::now(),
        };
        self.append_capped(ERROR_LOG_KEY, record, ERROR_LOG_CAP)
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.get(ERROR_LOG_KEY, Vec::new())
    }

    // ------------------------------------------------------------------
    // Study sessions
    // ------------------------------------------------------------------

    pub fn sessions(&self) -> Vec<StudySession> {
        self.get(SESSIONS_KEY, Vec::new())
    }

    /// Insert or replace by id.
    pub fn save_session(&self, session: &StudySession) -> Result<()> {
        let _lock = self.lock(true)?;
        let mut sessions: Vec<StudySession> = self.get_unlocked(SESSIONS_KEY, Vec::new());
        upsert(&mut sessions, session.clone(), |s| s.id == session.id);
        self.write_unlocked(SESSIONS_KEY, &sessions)
    }

    /// The most recently accessed session.
    pub fn latest_session(&self) -> Option<StudySession> {
        self.sessions()
            .into_iter()
            .max_by_key(|s| s.last_accessed)
    }

    // ------------------------------------------------------------------
    // Exam registrations and progress
    // ------------------------------------------------------------------

    pub fn registrations(&self) -> Vec<ExamRegistration> {
        self.get(REGISTRATIONS_KEY, Vec::new())
    }

    pub fn save_registration(&self, registration: &ExamRegistration) -> Result<()> {
        let _lock = self.lock(true)?;
        let mut all: Vec<ExamRegistration> = self.get_unlocked(REGISTRATIONS_KEY, Vec::new());
        upsert(&mut all, registration.clone(), |r| r.id == registration.id);
        self.write_unlocked(REGISTRATIONS_KEY, &all)
    }

    pub fn exam_progress(&self, exam_type: &str, state: &str) -> ExamProgress {
        self.get(
            &ExamProgress::storage_key(exam_type, state),
            ExamProgress::default(),
        )
    }

    pub fn save_exam_progress(
        &self,
        exam_type: &str,
        state: &str,
        progress: &ExamProgress,
    ) -> Result<()> {
        self.set(&ExamProgress::storage_key(exam_type, state), progress)
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
    match items.iter().position(same) {
        Some(pos) => items[pos] = item,
        None => items.push(item),
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600));
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

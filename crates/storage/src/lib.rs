use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, warn};

use shared::{config::CookieOptions, record::ConsentRecord};

/// The persisted key-value medium the consent decision lives in.
pub trait CookieJar: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    pub path: String,
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    /// Returns `None` for a non-positive max-age, which deletes the cookie. A
    /// max-age past the representable range never expires.
    pub fn new(value: &str, options: &CookieOptions, now: DateTime<Utc>) -> Option<Self> {
        if options.max_age_secs <= 0 {
            return None;
        }
        Some(Self {
            value: value.to_string(),
            path: options.path.clone(),
            secure: options.secure,
            expires_at: Duration::try_seconds(options.max_age_secs)
                .and_then(|max_age| now.checked_add_signed(max_age)),
        })
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

fn apply_set(
    cookies: &mut HashMap<String, StoredCookie>,
    name: &str,
    value: &str,
    options: &CookieOptions,
) {
    match StoredCookie::new(value, options, Utc::now()) {
        Some(cookie) => {
            cookies.insert(name.to_string(), cookie);
        }
        None => {
            cookies.remove(name);
        }
    }
}

/// Process-local jar. Clones share the same cookies, so a second controller
/// can be initialized from the store a first one wrote to.
#[derive(Clone, Default)]
pub struct MemoryCookieJar {
    cookies: Arc<Mutex<HashMap<String, StoredCookie>>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookie(&self, name: &str) -> Option<StoredCookie> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn insert_raw(&self, name: &str, cookie: StoredCookie) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), cookie);
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let live = cookies
            .get(name)
            .filter(|cookie| cookie.is_live(now))
            .map(|cookie| cookie.value.clone());
        if live.is_none() {
            cookies.remove(name);
        }
        live
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        apply_set(&mut cookies, name, value, options);
        Ok(())
    }
}

/// Jar persisted as a JSON map of cookie name to [`StoredCookie`]. The file is
/// re-read on every access; a missing or unreadable file is an empty jar.
#[derive(Debug, Clone)]
pub struct FileCookieJar {
    path: PathBuf,
}

impl FileCookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, StoredCookie> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(cookies) => cookies,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "cookies: unreadable cookie file, treating as empty"
                );
                HashMap::new()
            }
        }
    }

    fn persist(&self, cookies: &HashMap<String, StoredCookie>) -> Result<()> {
        ensure_parent_dir_exists(&self.path)?;
        let encoded =
            serde_json::to_string_pretty(cookies).context("failed to encode cookie file")?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, encoded).with_context(|| {
            format!("failed to write cookie file '{}'", staging.display())
        })?;
        fs::rename(&staging, &self.path).with_context(|| {
            format!(
                "failed to move cookie file into place at '{}'",
                self.path.display()
            )
        })?;
        Ok(())
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.load()
            .remove(name)
            .filter(|cookie| cookie.is_live(Utc::now()))
            .map(|cookie| cookie.value)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let mut cookies = self.load();
        let now = Utc::now();
        cookies.retain(|_, cookie| cookie.is_live(now));
        apply_set(&mut cookies, name, value, options);
        self.persist(&cookies)
    }
}

fn ensure_parent_dir_exists(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for cookie file '{}'",
            parent.display(),
            path.display()
        )
    })?;

    Ok(())
}

/// Durable read/write of the consent record on top of a [`CookieJar`].
#[derive(Clone)]
pub struct ConsentStore {
    jar: Arc<dyn CookieJar>,
}

impl ConsentStore {
    pub fn new(jar: Arc<dyn CookieJar>) -> Self {
        Self { jar }
    }

    /// Corrupt or type-mismatched payloads read as absent so the decision is
    /// simply asked for again.
    pub fn read(&self, name: &str) -> Option<ConsentRecord> {
        let raw = self.jar.get(name)?;
        match ConsentRecord::decode(&raw) {
            Ok(record) => {
                debug!(cookie = name, accepted = record.accepted, "consent: record read");
                Some(record)
            }
            Err(err) => {
                warn!(cookie = name, error = %err, "consent: discarding unusable record");
                None
            }
        }
    }

    pub fn write(&self, name: &str, record: &ConsentRecord, options: &CookieOptions) -> Result<()> {
        let encoded = record
            .encode()
            .with_context(|| format!("failed to encode consent record for cookie '{name}'"))?;
        self.jar
            .set(name, &encoded, options)
            .with_context(|| format!("failed to persist consent cookie '{name}'"))?;
        debug!(cookie = name, accepted = record.accepted, "consent: record written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

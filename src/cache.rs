use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::credentials::{Credentials, SessionCredentials, needs_refresh};

// Distinguishes temp files written by concurrent tasks in one process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Deterministic fingerprint of the parameters a session was derived from.
///
/// Built by hashing a canonical JSON rendering of the source type and its
/// parameters, so equal parameters always map to the same cache file and
/// any parameter change maps to a different one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        // serde_json serializes object keys in sorted order, which makes
        // the rendering canonical without extra work.
        let mut hasher = Sha256::new();
        hasher.update(payload.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted session: the fingerprint it was stored under, the
/// credentials and their expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "Fingerprint")]
    pub fingerprint: String,
    #[serde(rename = "Credentials")]
    pub credentials: Credentials,
    #[serde(rename = "Expiration")]
    pub expiration: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: &CacheKey, session: &SessionCredentials) -> Self {
        Self {
            fingerprint: key.as_str().to_string(),
            credentials: session.credentials.clone(),
            expiration: session.expiration,
        }
    }

    pub fn session(&self) -> SessionCredentials {
        SessionCredentials {
            credentials: self.credentials.clone(),
            expiration: self.expiration,
        }
    }

    /// Entries at or inside the refresh margin are not worth reusing.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        needs_refresh(self.expiration, now)
    }
}

/// On-disk cache of session credentials, one JSON file per fingerprint.
///
/// Reads never fail the resolution: anything missing, malformed or stored
/// under the wrong fingerprint is a miss. Writes go through a temp file
/// and a rename so concurrent processes always observe complete entries.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        let raw = fs::read_to_string(&path).await.ok()?;

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Ignoring malformed cache entry {}: {}", path.display(), err);
                return None;
            }
        };

        if entry.fingerprint != key.as_str() {
            debug!(
                "Fingerprint mismatch in {}, treating as a miss",
                path.display()
            );
            return None;
        }

        Some(entry)
    }

    pub async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;

        let body = serde_json::to_vec_pretty(entry)?;
        let tmp = self.root.join(format!(
            "{}.json.{}.{}.tmp",
            key,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, &body).await?;

        // Credential material is only for the owning user.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&tmp, self.entry_path(key)).await
    }

    /// Remove every cached entry, returning how many were deleted.
    pub async fn clear(&self) -> io::Result<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

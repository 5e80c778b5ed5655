//! [`IdentityStore`] — the username the bot connects with and its last kick,
//! persisted as one JSON document across restarts.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ---

use rand::Rng;

// ---

use afkbot_domain::{BotError, DisconnectRecord, IdentityRecord};

// ---

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// ---------------------------------------------------------------------------
// IdentityStore
// ---------------------------------------------------------------------------

/// Owns the [`IdentityRecord`] and writes it back on every mutation.
///
/// Persistence failures never propagate: they are logged and the in-memory
/// record stays authoritative for the rest of the process.
#[derive(Debug)]
pub struct IdentityStore {
    // ---
    path: PathBuf,
    record: IdentityRecord,
}

// ---

impl IdentityStore {
    // ---
    /// Load the record at `path`, or start from `base_username` when the
    /// file is missing or unreadable. The fallback is persisted immediately.
    pub fn load(path: impl Into<PathBuf>, base_username: &str) -> Self {
        // ---
        let path = path.into();

        match read_record(&path) {
            Ok(record) => {
                tracing::info!(username = %record.username, "identity loaded");
                if let Some(kick) = &record.last_disconnect {
                    tracing::warn!(
                        server = %kick.server_address,
                        username = %kick.username,
                        at = %kick.timestamp,
                        "last kick: \"{}\"",
                        kick.reason,
                    );
                }
                Self { path, record }
            }

            Err(BotError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no identity file, using defaults");
                Self::fallback(path, base_username)
            }

            Err(e) => {
                tracing::error!(path = %path.display(), "identity file unreadable ({e}), using defaults");
                Self::fallback(path, base_username)
            }
        }
    }

    // ---

    fn fallback(path: PathBuf, base_username: &str) -> Self {
        // ---
        let store = Self {
            path,
            record: IdentityRecord::new(base_username),
        };
        store.save();
        store
    }

    // ---

    #[cfg(test)]
    pub fn record(&self) -> &IdentityRecord {
        &self.record
    }

    pub fn username(&self) -> &str {
        &self.record.username
    }

    pub fn last_disconnect(&self) -> Option<&DisconnectRecord> {
        self.record.last_disconnect.as_ref()
    }

    // ---

    /// The session using `username` reached the world: make it the one to
    /// come back with.
    pub fn confirm(&mut self, username: &str) {
        self.record.username = username.to_string();
        self.save();
    }

    /// Replace the last kick.
    pub fn record_kick(&mut self, kick: DisconnectRecord) {
        self.record.last_disconnect = Some(kick);
        self.save();
    }

    /// Switch to a freshly generated username. Returns it.
    pub fn rotate(&mut self, base_username: &str, suffix_len: usize) -> String {
        // ---
        let username = generate_identity(base_username, suffix_len);
        tracing::info!(%username, "rotated identity");
        self.record.username = username.clone();
        self.save();
        username
    }

    // ---

    /// Write the record. Errors are logged, not returned.
    pub fn save(&self) {
        // ---
        match write_record(&self.path, &self.record) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "identity saved"),
            Err(e) => tracing::error!(path = %self.path.display(), "failed to save identity: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `base + "-" + suffix_len` random lowercase alphanumerics.
pub fn generate_identity(base_username: &str, suffix_len: usize) -> String {
    // ---
    let mut rng = rand::thread_rng();
    let suffix: String = (0..suffix_len)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{base_username}-{suffix}")
}

// ---

fn read_record(path: &Path) -> afkbot_domain::Result<IdentityRecord> {
    // ---
    let text = fs::read_to_string(path)?;
    let record: IdentityRecord = serde_json::from_str(&text)?;
    if record.username.trim().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "identity file has an empty username").into());
    }
    Ok(record)
}

// ---

/// Write to a sibling temp file, sync it, then rename over `path`, so a
/// concurrent reader sees either the old record or the new one.
fn write_record(path: &Path, record: &IdentityRecord) -> afkbot_domain::Result<()> {
    // ---
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_vec_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use super::{BackendKind, KvBackend, RecordKey, HEALTH_CHECK_KEY};
use crate::error::{Result, SiteError};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// File-backed local medium.
///
/// Each key is one `<encoded-key>.json` file in `root`. Writes go to a temp
/// file first and are renamed into place, so a crash never leaves a
/// half-written record. The total size of record files is bounded by an
/// optional quota.
pub struct FsBackend {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            quota_bytes: None,
        }
    }

    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(SiteError::Io)?;
        }
        Ok(())
    }

    fn used_bytes_excluding(&self, path: &Path) -> Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root).map_err(SiteError::Io)? {
            let entry = entry.map_err(SiteError::Io)?;
            let p = entry.path();
            if p == path || p.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            total += entry.metadata().map_err(SiteError::Io)?.len();
        }
        Ok(total)
    }

    fn write_raw(&self, key: &str, content: &str) -> Result<()> {
        self.ensure_dir()?;
        let target = self.record_path(key);

        if let Some(quota) = self.quota_bytes {
            let needed = content.len() as u64;
            let available = quota.saturating_sub(self.used_bytes_excluding(&target)?);
            if needed > available {
                return Err(SiteError::QuotaExceeded { needed, available });
            }
        }

        // Atomic write
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content).map_err(SiteError::Io)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(SiteError::Io(e));
        }
        Ok(())
    }
}

/// Maps a key to a file stem. Alphanumerics, `-` and `_` pass through;
/// every other byte becomes `%XX`, so distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

impl KvBackend for FsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn save(&self, key: &RecordKey, value: &Value) -> Result<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.write_raw(&key.key, &content)?;
        debug!(key = %key.key, bytes = content.len(), "record written");
        Ok(())
    }

    fn load(&self, key: &RecordKey) -> Result<Option<Value>> {
        let path = self.record_path(&key.key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(SiteError::Io)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn remove(&self, key: &RecordKey) -> Result<()> {
        let path = self.record_path(&key.key);
        if path.exists() {
            fs::remove_file(path).map_err(SiteError::Io)?;
        }
        Ok(())
    }

    fn health_check(&self) -> bool {
        let check = self.write_raw(HEALTH_CHECK_KEY, "\"test\"").and_then(|_| {
            let path = self.record_path(HEALTH_CHECK_KEY);
            let read = fs::read_to_string(&path).map_err(SiteError::Io)?;
            fs::remove_file(&path).map_err(SiteError::Io)?;
            Ok(read == "\"test\"")
        });
        match check {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, root = %self.root.display(), "local health check failed");
                false
            }
        }
    }
}

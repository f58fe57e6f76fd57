//! Content-addressed JSON cache on the local filesystem.
//!
//! Each entry lives at `<dir>/<key>.json`, where `key` is the hex SHA-256 of
//! a canonical (sorted-key) JSON rendering of the request description. The
//! file's modification time is its age: entries older than the TTL, and
//! entries that fail to decode, read as misses. Writes go through a temp
//! file in the same directory and a rename, so readers never see a partial
//! entry.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

/// Hex SHA-256 identifying one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hashes the canonical JSON of `parts`.
    ///
    /// Two descriptions that differ only in object key order hash equally.
    pub fn from_parts(parts: &Value) -> Self {
        let mut canonical = String::new();
        write_canonical(parts, &mut canonical);
        let digest = Sha256::digest(canonical.as_bytes());
        Self(format!("{digest:x}"))
    }

    /// The lower-case hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The request description hashed into a [`CacheKey`].
#[derive(Debug, Clone, Serialize)]
pub struct CacheKeyParts<'a> {
    /// Logical request shape, such as `rest` or `graphql`.
    pub kind: &'a str,
    /// Endpoint of the first page.
    pub endpoint: &'a str,
    /// Request fields as a JSON object.
    pub params: Value,
    /// `owner/name` of the repository the client is scoped to.
    pub repo: String,
}

impl CacheKeyParts<'_> {
    /// The cache key for these parts.
    pub fn key(&self) -> CacheKey {
        // Serializing a struct of strings and a Value cannot fail.
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        CacheKey::from_parts(&value)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// A directory of cached JSON responses with a freshness window.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    /// A cache in `dir` whose entries stay fresh for `ttl`.
    ///
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Directory holding the entry files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that stores the entry for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Returns the cached value for `key` if it exists, is no older than the
    /// TTL at `now`, and decodes.
    pub fn read(&self, key: &CacheKey, now: SystemTime) -> Option<Value> {
        let path = self.path_for(key);
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age > self.ttl {
            debug!(key = %key, ?age, "cache entry expired");
            return None;
        }

        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key = %key, error = %e, "cache entry unreadable; treating as miss");
                None
            }
        }
    }

    /// Atomically replaces the entry for `key`, creating the directory if
    /// needed.
    pub fn write(&self, key: &CacheKey, value: &Value) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, value)?;
        tmp.flush()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }
}

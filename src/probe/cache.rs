//! Memoization of external tool queries
//!
//! Keys combine the command tokens with the modification time and size of
//! every argument naming an existing file, so edits to the source invalidate
//! earlier answers. Failed runs are remembered too.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ClipperError, ClipperResult};

/// Outcome of a cached tool run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "output", rename_all = "lowercase")]
pub enum CachedOutput {
    /// Tool succeeded; `None` when it printed nothing
    Success(Option<String>),
    Failure,
}

/// Thread-safe query cache, optionally persisted as JSON
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: Mutex<HashMap<String, CachedOutput>>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache file; a missing file yields an empty cache
    pub fn load(path: &Path) -> ClipperResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)?;
        let entries: HashMap<String, CachedOutput> =
            serde_json::from_str(&text).map_err(|e| ClipperError::ConfigError {
                message: format!("Invalid probe cache {}: {}", path.display(), e),
            })?;
        debug!(entries = entries.len(), path = %path.display(), "Loaded probe cache");
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    pub fn save(&self, path: &Path) -> ClipperResult<()> {
        let text = {
            let entries = self.lock();
            serde_json::to_string_pretty(&*entries).map_err(|e| ClipperError::ConfigError {
                message: format!("Cannot serialize probe cache: {}", e),
            })?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<CachedOutput> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, value: CachedOutput) {
        self.lock().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CachedOutput>> {
        // A poisoned map is still a valid map.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Probe cache lock was poisoned");
                poisoned.into_inner()
            }
        }
    }
}

/// Cache key for `program args...`
pub fn cache_key<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut parts: Vec<String> = vec![program.to_string()];
    for arg in args {
        let token = arg.as_ref();
        parts.push(token.to_string());
        if token.starts_with('-') {
            continue;
        }
        if let Some((mtime_ns, size)) = file_fingerprint(Path::new(token)) {
            parts.push(mtime_ns.to_string());
            parts.push(size.to_string());
        }
    }
    parts.join("\u{1f}")
}

fn file_fingerprint(path: &Path) -> Option<(u128, u64)> {
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    let mtime_ns = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    Some((mtime_ns, meta.len()))
}

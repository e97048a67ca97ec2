use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{LazyLock, RwLock},
    time::{Duration, Instant},
};

use serde_yaml::Value;

use crate::{warn, DEBUG_NAME};

// Per-file cache so the watcher and the runner don't re-parse within a tick.
static YAML_CACHE: LazyLock<RwLock<HashMap<String, (Value, Instant)>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));
const CACHE_TTL: Duration = Duration::from_secs(1);
const CACHE_LIMIT: usize = 32;

pub fn load_yaml(path: &Path) -> Option<Value> {
    let now = Instant::now();
    let key = path.to_string_lossy().to_string();

    if let Ok(cache) = YAML_CACHE.read() {
        if let Some((v, t)) = cache.get(&key) {
            if now.duration_since(*t) < CACHE_TTL {
                return Some(v.clone());
            }
        }
    }

    let txt = fs::read_to_string(path).ok()?;
    let v: Value = match serde_yaml::from_str(&txt) {
        Ok(v) => v,
        Err(e) => {
            warn!("[{DEBUG_NAME}][CONFIG] Ignoring malformed {}: {e}", path.display());
            return None;
        }
    };

    if let Ok(mut cache) = YAML_CACHE.write() {
        if cache.len() >= CACHE_LIMIT {
            if let Some(oldest) = cache
                .iter()
                .min_by_key(|(_, (_, t))| *t)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest);
            }
        }
        cache.insert(key, (v.clone(), now));
    }
    Some(v)
}

/// Drops the cached copy so the next load re-reads the file.
pub fn invalidate(path: &Path) {
    if let Ok(mut cache) = YAML_CACHE.write() {
        cache.remove(path.to_string_lossy().as_ref());
    }
}

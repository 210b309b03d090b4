//! Two-tier (memory + disk) result cache with time-based expiry.
//!
//! The cache is an optimization only: every failure inside it is logged and
//! reported to the caller as a miss.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

const ENTRY_EXT: &str = "bin";

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime { SystemTime::now() }
}

struct MemoryEntry {
    stored_at: SystemTime,
    bytes: Vec<u8>,
}

pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    memory: Mutex<HashMap<String, MemoryEntry>>,
}

/// Deterministic cache key: `<prefix>_<sha256 hex>` over the parameters serialized as
/// JSON with object keys sorted, so field order never changes the key.
///
/// `None` when the parameters have no JSON form (e.g. maps with non-string keys);
/// callers skip the cache for that request.
pub fn key_for<P: Serialize + ?Sized>(prefix: &str, params: &P) -> Option<String> {
    let canonical = match serde_json::to_value(params) {
        Ok(value) => sorted(value).to_string(),
        Err(err) => {
            tracing::warn!(%err, prefix, "cache parameters not serializable, bypassing cache");
            return None;
        }
    };
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Some(format!("{prefix}_{:x}", hasher.finalize()))
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

impl ResultCache {
    pub fn new<P: AsRef<Path>>(dir: P, ttl: Duration) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(err) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), %err, "cache directory unavailable, disk tier disabled");
        }
        Self { dir, ttl, clock: Arc::new(SystemClock), memory: Mutex::new(HashMap::new()) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path { &self.dir }
    pub fn ttl(&self) -> Duration { self.ttl }

    pub fn key_for<P: Serialize + ?Sized>(prefix: &str, params: &P) -> Option<String> {
        key_for(prefix, params)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXT}"))
    }

    fn is_live(&self, stored_at: SystemTime) -> bool {
        let age = self.clock.now().duration_since(stored_at).unwrap_or(Duration::ZERO);
        age < self.ttl
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        // Held across the disk lookup so a concurrent put cannot be overwritten by a stale read.
        let mut memory = self.memory.lock();
        if let Some(entry) = memory.get(key) {
            if self.is_live(entry.stored_at) {
                match bincode::deserialize(&entry.bytes) {
                    Ok(value) => {
                        tracing::debug!(key, "cache hit (memory)");
                        return Some(value);
                    }
                    Err(err) => tracing::warn!(key, %err, "undecodable memory cache entry"),
                }
            }
            memory.remove(key);
        }

        let path = self.entry_path(key);
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => {
                tracing::debug!(key, "cache miss");
                return None;
            }
        };
        if !self.is_live(modified) {
            remove_quietly(&path);
            tracing::debug!(key, "cache entry expired");
            return None;
        }
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(key, %err, "cache entry unreadable");
                return None;
            }
        };
        match bincode::deserialize::<T>(&bytes) {
            Ok(value) => {
                tracing::debug!(key, "cache hit (disk)");
                // Keep the disk timestamp so both tiers expire together.
                memory.insert(key.to_string(), MemoryEntry { stored_at: modified, bytes });
                Some(value)
            }
            Err(err) => {
                tracing::warn!(key, %err, "dropping corrupt cache entry");
                remove_quietly(&path);
                None
            }
        }
    }

    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let bytes = match bincode::serialize(value) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(key, %err, "cache value not serializable");
                return;
            }
        };
        self.memory
            .lock()
            .insert(key.to_string(), MemoryEntry { stored_at: self.clock.now(), bytes: bytes.clone() });
        if let Err(err) = self.write_entry(key, &bytes) {
            tracing::warn!(key, %err, "cache disk write failed");
        }
    }

    fn write_entry(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        // The file mtime is the disk tier's expiry clock.
        if let Err(err) = tmp.as_file().set_modified(self.clock.now()) {
            tracing::debug!(key, %err, "could not stamp cache entry");
        }
        tmp.persist(self.entry_path(key))?;
        Ok(())
    }

    pub fn contains_in_memory(&self, key: &str) -> bool {
        self.memory.lock().contains_key(key)
    }

    pub fn clear(&self) {
        self.memory.lock().clear();
        for path in self.disk_entries() {
            remove_quietly(&path);
        }
    }

    /// Remove entries at or past the TTL from both tiers. Returns how many disk files went away.
    pub fn clear_expired(&self) -> usize {
        self.memory.lock().retain(|_, e| self.is_live(e.stored_at));
        let mut removed = 0;
        for path in self.disk_entries() {
            let live = fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(|t| self.is_live(t))
                .unwrap_or(false);
            if !live && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn disk_entries(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.dir) {
            Ok(rd) => rd
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), %err, "cache directory unreadable");
                Vec::new()
            }
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        tracing::debug!(file = %path.display(), %err, "cache file removal failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    struct ManualClock(Mutex<SystemTime>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> SystemTime { *self.0.lock() }
    }

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn key_is_order_independent() {
        let a = key_for("p", &json!({"a": 1, "b": 2})).unwrap();
        let b = key_for("p", &json!({"b": 2, "a": 1})).unwrap();
        let c = key_for("p", &json!({"a": 1, "b": 3})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("p_"));
        assert_eq!(a.len(), "p_".len() + 64);
    }

    #[test]
    fn nested_keys_are_sorted_too() {
        let a = key_for("natal", &json!({"who": {"lat": 1.5, "lon": 2.5}, "tz": "UTC"}));
        let b = key_for("natal", &json!({"tz": "UTC", "who": {"lon": 2.5, "lat": 1.5}}));
        assert_eq!(a, b);
        assert_ne!(a, key_for("transit", &json!({"tz": "UTC", "who": {"lon": 2.5, "lat": 1.5}})));
    }

    #[test]
    fn params_without_json_form_get_no_key() {
        let mut first: HashMap<(u8, u8), &str> = HashMap::new();
        first.insert((1, 2), "sun");
        let mut second: HashMap<(u8, u8), &str> = HashMap::new();
        second.insert((3, 4), "moon");
        assert_eq!(key_for("natal", &first), None);
        assert_eq!(ResultCache::key_for("natal", &second), None);
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::new(dir.path(), DAY);
        let value = vec![("sun".to_string(), 10.5f64), ("moon".to_string(), 200.25)];
        cache.put("k", &value);
        assert_eq!(cache.get::<Vec<(String, f64)>>("k"), Some(value));
        assert!(dir.path().join("k.bin").exists());
    }

    #[test]
    fn disk_hit_repopulates_memory() {
        let dir = tempdir().unwrap();
        ResultCache::new(dir.path(), DAY).put("k", "persisted");

        let fresh = ResultCache::new(dir.path(), DAY);
        assert!(!fresh.contains_in_memory("k"));
        assert_eq!(fresh.get::<String>("k").as_deref(), Some("persisted"));
        assert!(fresh.contains_in_memory("k"));
    }

    #[test]
    fn expired_entries_are_absent_and_swept() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock(Mutex::new(SystemTime::now())));
        let cache = ResultCache::new(dir.path(), DAY).with_clock(clock.clone());
        cache.put("old", &1u32);
        clock.advance(DAY + Duration::from_secs(1));
        cache.put("new", &2u32);

        assert_eq!(cache.clear_expired(), 1);
        assert!(!dir.path().join("old.bin").exists());
        assert!(dir.path().join("new.bin").exists());
        assert_eq!(cache.get::<u32>("old"), None);
        assert_eq!(cache.get::<u32>("new"), Some(2));
    }

    #[test]
    fn expired_get_purges_both_tiers() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock(Mutex::new(SystemTime::now())));
        let cache = ResultCache::new(dir.path(), DAY).with_clock(clock.clone());
        cache.put("k", &"v");
        clock.advance(DAY * 2);
        assert_eq!(cache.get::<String>("k"), None);
        assert!(!cache.contains_in_memory("k"));
        assert!(!dir.path().join("k.bin").exists());
    }

    #[test]
    fn corrupt_file_is_a_miss_and_removed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.bin"), [1u8, 2, 3]).unwrap();
        let cache = ResultCache::new(dir.path(), DAY);
        assert_eq!(cache.get::<String>("bad"), None);
        assert!(!dir.path().join("bad.bin").exists());
    }

    #[test]
    fn unwritable_disk_still_serves_memory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // A regular file where the directory should be: every disk operation fails.
        let cache = ResultCache::new(&blocker, DAY);
        cache.put("k", &7i64);
        assert_eq!(cache.get::<i64>("k"), Some(7));
        cache.clear();
        assert_eq!(cache.get::<i64>("k"), None);
    }
}

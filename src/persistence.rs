//! Per-canvas storage of stroke lists and viewports.
//!
//! Backends report failures through `anyhow`; `CanvasStorage` swallows them
//! and reads as "no data" so the engine never blocks on storage.

use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::canvas::{CanvasIndex, CanvasSession, Viewport};
use crate::drawing::Stroke;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating storage dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing {}", path.display()))
            }
            _ => Ok(()),
        }
    }
}

fn strokes_key(index: CanvasIndex) -> String {
    format!("strokes-{index}")
}

fn view_key(index: CanvasIndex) -> String {
    format!("view-{index}")
}

const ACTIVE_KEY: &str = "active-canvas";

pub struct CanvasStorage {
    store: Box<dyn KeyValueStore>,
    max_bytes: usize,
}

impl CanvasStorage {
    pub fn new(store: Box<dyn KeyValueStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()), 5 * 1024 * 1024)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("storage read {key} failed: {e:#}");
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) -> bool {
        if value.len() > self.max_bytes {
            log::warn!(
                "storage write {key} skipped: {} bytes over limit {}",
                value.len(),
                self.max_bytes
            );
            return false;
        }
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("storage write {key} failed: {e:#}");
                false
            }
        }
    }

    /// Stored strokes, or an empty list if absent or unreadable. Ids are not
    /// assigned here.
    pub fn load_strokes(&self, index: CanvasIndex) -> Vec<Stroke> {
        let key = strokes_key(index);
        let Some(raw) = self.read(&key) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("discarding corrupt {key}: {e}");
            Vec::new()
        })
    }

    pub fn save_strokes(&mut self, index: CanvasIndex, strokes: &[Stroke]) -> bool {
        match serde_json::to_string(strokes) {
            Ok(raw) => self.write(&strokes_key(index), &raw),
            Err(e) => {
                log::warn!("serializing strokes for canvas {index} failed: {e}");
                false
            }
        }
    }

    pub fn load_view(&self, index: CanvasIndex, fallback: Viewport) -> Viewport {
        let key = view_key(index);
        self.read(&key)
            .and_then(|raw| serde_json::from_str::<Viewport>(&raw).ok())
            .map(|v| v.sanitized(fallback))
            .unwrap_or(fallback)
    }

    pub fn save_view(&mut self, index: CanvasIndex, view: &Viewport) -> bool {
        match serde_json::to_string(view) {
            Ok(raw) => self.write(&view_key(index), &raw),
            Err(e) => {
                log::warn!("serializing view for canvas {index} failed: {e}");
                false
            }
        }
    }

    pub fn load_active(&self) -> Option<CanvasIndex> {
        self.read(ACTIVE_KEY)
            .and_then(|raw| serde_json::from_str::<CanvasIndex>(raw.trim()).ok())
    }

    pub fn save_active(&mut self, index: CanvasIndex) -> bool {
        self.write(ACTIVE_KEY, &index.to_string())
    }

    pub fn load_session(&self, index: CanvasIndex, fallback_view: Viewport) -> CanvasSession {
        let strokes = self.load_strokes(index);
        let view = self.load_view(index, fallback_view);
        log::debug!("loaded canvas {index}: {} strokes", strokes.len());
        CanvasSession::with_strokes(index, strokes, view)
    }

    pub fn save_session(&mut self, session: &CanvasSession) {
        self.save_strokes(session.index, &session.strokes);
        self.save_view(session.index, &session.view);
    }

    /// Loads the stored strokes of `index`, lets `f` edit them and writes
    /// them back if `f` reports a change.
    pub fn rewrite_strokes(
        &mut self,
        index: CanvasIndex,
        f: impl FnOnce(&mut Vec<Stroke>) -> bool,
    ) -> bool {
        let mut strokes = self.load_strokes(index);
        if strokes.is_empty() || !f(&mut strokes) {
            return false;
        }
        self.save_strokes(index, &strokes)
    }
}

/// Delayed save that restarts on every `schedule`.
#[derive(Debug, Clone)]
pub struct SaveDebounce {
    delay: Duration,
    due: Option<Instant>,
}

impl SaveDebounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, due: None }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    /// True once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("storage unavailable")
        }
        fn set(&mut self, _: &str, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }
        fn remove(&mut self, _: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn index(n: u8) -> CanvasIndex {
        CanvasIndex::new(n).unwrap()
    }

    fn strokes() -> Vec<Stroke> {
        vec![Stroke::freehand(
            vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)],
            "#000000",
            2.0,
        )]
    }

    #[test]
    fn round_trips_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = CanvasStorage::new(Box::new(FileStore::open(dir.path()).unwrap()), 1 << 20);
        assert!(storage.save_strokes(index(2), &strokes()));
        let view = Viewport::new(10.0, 20.0, 2.0);
        assert!(storage.save_view(index(2), &view));
        assert!(storage.save_active(index(2)));

        let reopened = CanvasStorage::new(Box::new(FileStore::open(dir.path()).unwrap()), 1 << 20);
        assert_eq!(reopened.load_strokes(index(2)), strokes());
        assert_eq!(reopened.load_view(index(2), Viewport::default()), view);
        assert_eq!(reopened.load_active(), Some(index(2)));
        assert!(dir.path().join("strokes-2.json").exists());
    }

    #[test]
    fn failures_read_as_no_data() {
        let mut storage = CanvasStorage::new(Box::new(BrokenStore), 1 << 20);
        let fallback = Viewport::centered(800.0, 600.0);
        assert!(storage.load_strokes(index(1)).is_empty());
        assert_eq!(storage.load_view(index(1), fallback), fallback);
        assert!(!storage.save_strokes(index(1), &strokes()));
    }

    #[test]
    fn corrupt_json_reads_as_empty() {
        let mut store = MemoryStore::new();
        store.set("strokes-1", "[{\"points\": oops").unwrap();
        store.set("view-1", "{\"x\": \"left\"}").unwrap();
        let storage = CanvasStorage::new(Box::new(store), 1 << 20);
        assert!(storage.load_strokes(index(1)).is_empty());
        assert_eq!(storage.load_view(index(1), Viewport::default()), Viewport::default());
    }

    #[test]
    fn oversized_writes_are_skipped() {
        let mut storage = CanvasStorage::new(Box::new(MemoryStore::new()), 16);
        assert!(!storage.save_strokes(index(1), &strokes()));
        assert!(storage.load_strokes(index(1)).is_empty());
    }

    #[test]
    fn loaded_session_has_ids() {
        let mut storage = CanvasStorage::in_memory();
        storage.save_strokes(index(4), &strokes());
        let session = storage.load_session(index(4), Viewport::default());
        assert!(session.strokes[0].id.is_assigned());
        assert!(!session.history.can_undo());
    }

    #[test]
    fn debounce_restarts_on_schedule() {
        let t0 = Instant::now();
        let mut debounce = SaveDebounce::new(Duration::from_millis(500));
        debounce.schedule(t0);
        debounce.schedule(t0 + Duration::from_millis(400));
        assert!(!debounce.poll(t0 + Duration::from_millis(600)));
        assert!(debounce.poll(t0 + Duration::from_millis(900)));
        assert!(!debounce.poll(t0 + Duration::from_millis(1000)));
    }
}

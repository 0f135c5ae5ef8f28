use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::{error::Error, record::Record, util::mkdir_if_not_exists};

pub type LocalStoreHandle = Arc<LocalStore>;

pub const AUTH_SLOT: &str = "arsip_authenticated";
pub const SNAPSHOT_SLOT: &str = "arsip_memories_data";

/// Keyed durable slots, one file per key inside `base`.
pub struct LocalStore {
    base: PathBuf,
    writing: Mutex<()>,
}

impl LocalStore {
    pub fn open(base: PathBuf) -> Result<LocalStoreHandle, Error> {
        mkdir_if_not_exists(&base)?;
        Ok(Arc::new(Self {
            base,
            writing: Mutex::new(()),
        }))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.key(key)).ok()
    }

    /// Replace the slot content.  The new value becomes visible atomically, a
    /// reader never observes a half-written slot.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        let _guard = self.writing.lock();
        let mut file = NamedTempFile::new_in(&self.base)?;
        file.write_all(value)?;
        file.flush()?;
        file.persist(self.key(key))?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), Error> {
        let _guard = self.writing.lock();
        fs::remove_file(self.key(key)).or_else(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(err.into())
            }
        })
    }

    fn key(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

/// Last known full record set, kept for instant rendering before the network
/// answers.  Not a source of truth.
#[derive(Clone)]
pub struct SnapshotCache {
    store: LocalStoreHandle,
}

impl SnapshotCache {
    pub fn new(store: LocalStoreHandle) -> Self {
        Self { store }
    }

    /// Returns `None` for a missing, unreadable or malformed snapshot.
    pub fn load(&self) -> Option<Vec<Record>> {
        let bytes = self.store.get(SNAPSHOT_SLOT)?;
        match serde_json::from_slice(&bytes) {
            Ok(records) => Some(records),
            Err(err) => {
                log::error!("failed to parse memories snapshot: {}", err);
                None
            }
        }
    }

    pub fn save(&self, records: &[Record]) -> Result<(), Error> {
        log::debug!("saving snapshot of {} records", records.len());
        let bytes = serde_json::to_vec(records)?;
        self.store.set(SNAPSHOT_SLOT, &bytes)
    }

    pub fn raw(&self) -> Option<Vec<u8>> {
        self.store.get(SNAPSHOT_SLOT)
    }

    /// Put back bytes taken earlier with `raw`, `None` meaning no snapshot.
    pub fn restore(&self, raw: Option<&[u8]>) -> Result<(), Error> {
        match raw {
            Some(bytes) => self.store.set(SNAPSHOT_SLOT, bytes),
            None => self.store.remove(SNAPSHOT_SLOT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStoreHandle) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path().join("local")).unwrap();
        (dir, store)
    }

    fn beach() -> Record {
        Record {
            id: "1".into(),
            image_ref: "https://drive.google.com/thumbnail?sz=w1000&id=beach".into(),
            title: "Beach".into(),
            caption: "Ombak sore".into(),
            created_at: "2023-01-01".into(),
            rotation: 1.5,
            sway_variant: None,
        }
    }

    #[test]
    fn slots_are_independent() {
        let (_dir, store) = store();
        store.set(AUTH_SLOT, b"true").unwrap();
        store.set(SNAPSHOT_SLOT, b"[]").unwrap();
        store.remove(AUTH_SLOT).unwrap();

        assert_eq!(store.get(AUTH_SLOT), None);
        assert_eq!(store.get(SNAPSHOT_SLOT).as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn removing_a_missing_slot_is_fine() {
        let (_dir, store) = store();
        store.remove("nothing-here").unwrap();
    }

    #[test]
    fn snapshot_is_overwritten_as_a_whole() {
        let (_dir, store) = store();
        let cache = SnapshotCache::new(store);
        cache.save(&[beach(), beach()]).unwrap();
        cache.save(&[beach()]).unwrap();

        assert_eq!(cache.load(), Some(vec![beach()]));
    }

    #[test]
    fn malformed_snapshot_reads_as_absent() {
        let (_dir, store) = store();
        let cache = SnapshotCache::new(store.clone());

        assert_eq!(cache.load(), None);

        store.set(SNAPSHOT_SLOT, b"{\"not\": \"a list\"}").unwrap();
        assert_eq!(cache.load(), None);

        store.set(SNAPSHOT_SLOT, b"[{\"id\": ").unwrap();
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn restore_puts_back_the_exact_bytes() {
        let (_dir, store) = store();
        let cache = SnapshotCache::new(store);
        let raw: &[u8] = br#"[ {"id":"1","imageUrl":"x","title":"","description":"","date":"","rotation":1} ]"#;

        cache.restore(Some(raw)).unwrap();
        cache.save(&[beach()]).unwrap();
        cache.restore(Some(raw)).unwrap();
        assert_eq!(cache.raw().as_deref(), Some(raw));

        cache.restore(None).unwrap();
        assert_eq!(cache.raw(), None);
    }

    #[test]
    fn snapshot_without_sway_class_loads() {
        let (_dir, store) = store();
        store
            .set(
                SNAPSHOT_SLOT,
                br#"[{"id":"1","imageUrl":"https://drive.google.com/thumbnail?sz=w1000&id=beach","title":"Beach","description":"Ombak sore","date":"2023-01-01","rotation":1.5}]"#,
            )
            .unwrap();
        let cache = SnapshotCache::new(store);

        assert_eq!(cache.load(), Some(vec![beach()]));
    }
}

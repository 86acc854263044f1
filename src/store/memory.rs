use anyhow::{bail, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::model::{
    Association, Picture, PictureAlbum, PictureAlbumPicture, PictureTag, PokemonTrainer, Record,
    RecordId,
};
use crate::store::traits::{AssociationStore, PictureStore, RecordStore};

/// One resource table: rows keyed by id plus the next surrogate id.
#[derive(Debug)]
pub struct MemoryTable<R> {
    state: RwLock<TableState<R>>,
}

#[derive(Debug)]
struct TableState<R> {
    rows: BTreeMap<RecordId, R>,
    next_id: RecordId,
}

impl<R> MemoryTable<R> {
    fn new() -> Self {
        Self {
            state: RwLock::new(TableState {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn contains(&self, id: RecordId) -> bool {
        self.state.read().rows.contains_key(&id)
    }

    fn retain(&self, mut keep: impl FnMut(&R) -> bool) {
        self.state.write().rows.retain(|_, row| keep(&*row));
    }
}

impl<R: Record> MemoryTable<R> {
    /// Foreign key check: the referenced row must exist.
    fn require(&self, id: RecordId) -> Result<()> {
        if !self.contains(id) {
            bail!("foreign key violation: {} {} does not exist", R::RESOURCE, id);
        }
        Ok(())
    }
}

/// Injected failures, used to exercise fault handling without a database.
#[derive(Debug, Default)]
struct FaultPlan {
    fail_reads: AtomicBool,
    /// Number of row writes that still succeed; `Some(0)` fails every write
    writes_until_failure: Mutex<Option<usize>>,
}

impl FaultPlan {
    fn check_read(&self, resource: &str) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("injected read fault on {}", resource);
        }
        Ok(())
    }

    fn check_write(&self, resource: &str) -> Result<()> {
        let mut remaining = self.writes_until_failure.lock();
        match remaining.as_mut() {
            Some(0) => bail!("injected write fault on {}", resource),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Process-local store for development and tests.
///
/// Locks are never held across an `.await`, and no table lock is taken while
/// another is held. `insert_many` stages every row before publishing any of
/// them, so a failure part-way leaves the table untouched. References and
/// cascades follow the PostgreSQL schema.
#[derive(Debug)]
pub struct MemoryStore {
    pictures: MemoryTable<Picture>,
    albums: MemoryTable<PictureAlbum>,
    tags: MemoryTable<PictureTag>,
    album_pictures: MemoryTable<PictureAlbumPicture>,
    trainers: MemoryTable<PokemonTrainer>,
    faults: FaultPlan,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            pictures: MemoryTable::new(),
            albums: MemoryTable::new(),
            tags: MemoryTable::new(),
            album_pictures: MemoryTable::new(),
            trainers: MemoryTable::new(),
            faults: FaultPlan::default(),
        }
    }

    /// Make every read fail until cleared.
    pub fn fail_reads(&self, enabled: bool) {
        self.faults.fail_reads.store(enabled, Ordering::SeqCst);
    }

    /// Let the next `successful_writes` row writes through, then fail every
    /// write until [`MemoryStore::clear_faults`] is called.
    pub fn fail_writes_after(&self, successful_writes: usize) {
        *self.faults.writes_until_failure.lock() = Some(successful_writes);
    }

    pub fn clear_faults(&self) {
        self.fail_reads(false);
        *self.faults.writes_until_failure.lock() = None;
    }
}

/// Maps a record type onto its table inside [`MemoryStore`].
pub trait MemoryRecord: Record {
    fn table(store: &MemoryStore) -> &MemoryTable<Self>;

    /// Rows this record references must exist.
    fn check_references(&self, _store: &MemoryStore) -> Result<()> {
        Ok(())
    }

    /// Remove rows that reference the deleted `ids`.
    fn cascade_delete(_store: &MemoryStore, _ids: &[RecordId]) {}
}

impl MemoryRecord for Picture {
    fn table(store: &MemoryStore) -> &MemoryTable<Self> {
        &store.pictures
    }

    fn cascade_delete(store: &MemoryStore, ids: &[RecordId]) {
        store.tags.retain(|tag| !ids.contains(&tag.picture_id));
        store
            .album_pictures
            .retain(|link| !ids.contains(&link.picture_id));
    }
}

impl MemoryRecord for PictureAlbum {
    fn table(store: &MemoryStore) -> &MemoryTable<Self> {
        &store.albums
    }

    fn cascade_delete(store: &MemoryStore, ids: &[RecordId]) {
        store
            .album_pictures
            .retain(|link| !ids.contains(&link.picture_album_id));
    }
}

impl MemoryRecord for PictureTag {
    fn table(store: &MemoryStore) -> &MemoryTable<Self> {
        &store.tags
    }

    fn check_references(&self, store: &MemoryStore) -> Result<()> {
        store.pictures.require(self.picture_id)
    }
}

impl MemoryRecord for PictureAlbumPicture {
    fn table(store: &MemoryStore) -> &MemoryTable<Self> {
        &store.album_pictures
    }

    fn check_references(&self, store: &MemoryStore) -> Result<()> {
        store.albums.require(self.picture_album_id)?;
        store.pictures.require(self.picture_id)
    }
}

impl MemoryRecord for PokemonTrainer {
    fn table(store: &MemoryStore) -> &MemoryTable<Self> {
        &store.trainers
    }
}

#[async_trait::async_trait]
impl<R: MemoryRecord> RecordStore<R> for MemoryStore {
    async fn find_all(&self) -> Result<Vec<R>> {
        self.faults.check_read(R::RESOURCE)?;
        let state = R::table(self).state.read();
        Ok(state.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<R>> {
        self.faults.check_read(R::RESOURCE)?;
        let state = R::table(self).state.read();
        Ok(state.rows.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[RecordId]) -> Result<Vec<R>> {
        self.faults.check_read(R::RESOURCE)?;
        let wanted: BTreeSet<RecordId> = ids.iter().copied().collect();
        let state = R::table(self).state.read();
        Ok(wanted
            .iter()
            .filter_map(|id| state.rows.get(id).cloned())
            .collect())
    }

    async fn insert(&self, mut record: R) -> Result<R> {
        self.faults.check_write(R::RESOURCE)?;
        record.check_references(self)?;
        let mut state = R::table(self).state.write();
        let id = state.next_id;
        state.next_id += 1;
        record.set_id(id);
        state.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn insert_many(&self, records: Vec<R>) -> Result<Vec<R>> {
        for record in &records {
            record.check_references(self)?;
        }
        let mut state = R::table(self).state.write();
        let mut next_id = state.next_id;
        let mut staged = Vec::with_capacity(records.len());

        for mut record in records {
            self.faults.check_write(R::RESOURCE)?;
            record.set_id(next_id);
            next_id += 1;
            staged.push(record);
        }

        for record in &staged {
            state.rows.insert(record.id(), record.clone());
        }
        state.next_id = next_id;

        Ok(staged)
    }

    async fn update(&self, record: R) -> Result<Option<R>> {
        self.faults.check_write(R::RESOURCE)?;
        record.check_references(self)?;
        let mut state = R::table(self).state.write();
        match state.rows.get_mut(&record.id()) {
            Some(existing) => {
                *existing = record.clone();
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        self.faults.check_write(R::RESOURCE)?;
        let removed = R::table(self).state.write().rows.remove(&id).is_some();
        if removed {
            R::cascade_delete(self, &[id]);
        }
        Ok(removed)
    }

    async fn delete_many(&self, ids: &[RecordId]) -> Result<u64> {
        self.faults.check_write(R::RESOURCE)?;
        let removed: Vec<RecordId> = {
            let mut state = R::table(self).state.write();
            ids.iter()
                .copied()
                .filter(|id| state.rows.remove(id).is_some())
                .collect()
        };
        if !removed.is_empty() {
            R::cascade_delete(self, &removed);
        }
        Ok(removed.len() as u64)
    }
}

#[async_trait::async_trait]
impl<A: MemoryRecord + Association> AssociationStore<A> for MemoryStore {
    async fn find_by_owner(&self, owner_id: RecordId) -> Result<Vec<A>> {
        self.faults.check_read(A::RESOURCE)?;
        let state = A::table(self).state.read();
        Ok(state
            .rows
            .values()
            .filter(|row| row.owner_id() == owner_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl PictureStore for MemoryStore {
    async fn find_by_blob_id(&self, blob_id: Uuid) -> Result<Option<Picture>> {
        self.faults.check_read(Picture::RESOURCE)?;
        let state = self.pictures.state.read();
        Ok(state
            .rows
            .values()
            .find(|picture| picture.blob_id == Some(blob_id))
            .cloned())
    }

    async fn set_low_resolution(
        &self,
        picture_id: RecordId,
        has_low_resolution: bool,
    ) -> Result<Option<Picture>> {
        self.faults.check_write(Picture::RESOURCE)?;
        let mut state = self.pictures.state.write();
        Ok(state.rows.get_mut(&picture_id).map(|picture| {
            picture.has_low_resolution = has_low_resolution;
            picture.clone()
        }))
    }
}

//! World-scoped, authoritative spawn store.
//!
//! [`PrimaryStore`] lives in memory for one world session and is only marked dirty on
//! writes; the host persists it on its own save cycle through [`WorldSave`], which keeps
//! the records in a sled tree next to the rest of the world data.

use std::collections::HashMap;
use std::path::Path;

use sled::IVec;

use crate::spawn::errors::SpawnError;
use crate::spawn::types::{ParticipantId, SpawnRecord};

const TREE_SPAWNS: &str = "spawn_records";

/// In-memory map of participant id to spawn record for the current world session.
#[derive(Debug, Default, Clone)]
pub struct PrimaryStore {
    records: HashMap<ParticipantId, SpawnRecord>,
    dirty: bool,
    mutations: u64,
}

impl PrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup, regardless of dimension.
    pub fn get(&self, id: ParticipantId) -> Option<&SpawnRecord> {
        self.records.get(&id)
    }

    /// Lookup scoped to `dimension`; a record from another dimension reads as absent.
    pub fn get_in(&self, id: ParticipantId, dimension: &str) -> Option<&SpawnRecord> {
        self.records.get(&id).filter(|r| r.is_in(dimension))
    }

    pub fn is_assigned(&self, id: ParticipantId, dimension: &str) -> bool {
        self.get_in(id, dimension).map(|r| r.assigned).unwrap_or(false)
    }

    /// Insert or replace the participant's record and mark the store dirty.
    pub fn put(&mut self, id: ParticipantId, record: SpawnRecord) {
        self.records.insert(id, record);
        self.dirty = true;
        self.mutations += 1;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of `put` calls over the lifetime of this store.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &SpawnRecord)> {
        self.records.iter()
    }
}

/// Sled-backed persistence for the primary store, opened once per world session.
pub struct WorldSave {
    _db: sled::Db,
    spawns: sled::Tree,
}

impl WorldSave {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SpawnError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let spawns = db.open_tree(TREE_SPAWNS)?;
        Ok(Self { _db: db, spawns })
    }

    fn serialize(record: &SpawnRecord) -> Result<Vec<u8>, SpawnError> {
        Ok(bincode::serialize(record)?)
    }

    fn deserialize(bytes: IVec) -> Result<SpawnRecord, SpawnError> {
        Ok(bincode::deserialize::<SpawnRecord>(&bytes)?)
    }

    fn decode_entry(key: &IVec, value: IVec) -> Result<(ParticipantId, SpawnRecord), SpawnError> {
        let text = String::from_utf8_lossy(key);
        let id = ParticipantId::parse(&text)
            .ok_or_else(|| SpawnError::CorruptRecord(format!("bad participant key: {}", text)))?;
        Ok((id, Self::deserialize(value)?))
    }

    /// Load every stored record. Entries that fail to decode are skipped with a warning.
    pub fn load_primary(&self) -> Result<PrimaryStore, SpawnError> {
        let mut store = PrimaryStore::new();
        for entry in self.spawns.iter() {
            let (key, value) = entry?;
            match Self::decode_entry(&key, value) {
                Ok((id, record)) => {
                    store.records.insert(id, record);
                }
                Err(e) => log::warn!("world save: skipping spawn record: {}", e),
            }
        }
        log::debug!("world save: loaded {} spawn records", store.len());
        Ok(store)
    }

    /// Write the store if it is dirty, then clear the dirty flag. Returns records written.
    pub fn save_primary(&self, store: &mut PrimaryStore) -> Result<usize, SpawnError> {
        if !store.dirty {
            return Ok(0);
        }
        let mut batch = sled::Batch::default();
        for (id, record) in &store.records {
            batch.insert(id.to_string().into_bytes(), Self::serialize(record)?);
        }
        self.spawns.apply_batch(batch)?;
        self.spawns.flush()?;
        store.dirty = false;
        log::debug!("world save: wrote {} spawn records", store.len());
        Ok(store.len())
    }
}

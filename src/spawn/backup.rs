//! Redundant spawn backup kept in a standalone JSON file.
//!
//! Overview
//! - Survives world-store resets; consulted before a participant is treated as new
//! - Schema: pretty-printed object keyed by participant id string, each value a
//!   [`SpawnRecord`] (`x`, `y`, `z`, `dimension`, `name`, `assigned`)
//! - Lookup: by id first, then by display name (case-insensitive) when a name is given
//! - Locations: a current path and a legacy path; lookups read the legacy file only while
//!   the current file does not exist; writes touch the current file alone
//! - Writes: read the whole file, upsert one key, write the whole file back
//! - Concurrency: fs2 shared lock while reading, exclusive lock while writing
//! - Corruption: an unparsable file reads as empty and is replaced on the next write

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::logutil::escape_log;
use crate::spawn::errors::SpawnError;
use crate::spawn::types::{ParticipantId, SpawnRecord};

/// On-disk file schema.
pub type BackupFile = BTreeMap<String, SpawnRecord>;

struct ReadResult {
    data: BackupFile,
    source: PathBuf,
}

pub struct BackupStore {
    current: PathBuf,
    legacy: PathBuf,
    writes: u64,
}

fn normalize_name(name: &str) -> &str {
    name.trim()
}

fn read_file(path: &Path) -> Result<BackupFile, SpawnError> {
    if !path.exists() {
        return Ok(BackupFile::new());
    }
    let mut f = fs::OpenOptions::new().read(true).open(path)?;
    f.lock_shared()?;
    let mut s = String::new();
    let read = f.read_to_string(&mut s);
    let _ = f.unlock();
    read?;

    let cleaned = s.trim_start_matches('\0').trim();
    if cleaned.is_empty() {
        return Ok(BackupFile::new());
    }
    match serde_json::from_str::<BackupFile>(cleaned) {
        Ok(data) => Ok(data),
        Err(e) => {
            log::error!(
                "spawn backup {:?} is corrupted; treating as empty until next write: {}",
                path,
                e
            );
            Ok(BackupFile::new())
        }
    }
}

fn write_file(path: &Path, data: &BackupFile) -> Result<(), SpawnError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(data)?;
    let mut f = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    f.lock_exclusive()?;
    let written = (|| -> std::io::Result<()> {
        f.seek(SeekFrom::Start(0))?;
        f.set_len(0)?;
        f.write_all(content.as_bytes())?;
        f.flush()?;
        f.sync_all()
    })();
    let _ = f.unlock();
    written?;
    Ok(())
}

fn find_by_name<'a>(data: &'a BackupFile, name: &str) -> Option<&'a SpawnRecord> {
    let search = name.to_lowercase();
    data.values()
        .find(|entry| !entry.name.is_empty() && entry.name.to_lowercase() == search)
}

impl BackupStore {
    pub fn new(current: impl Into<PathBuf>, legacy: impl Into<PathBuf>) -> Self {
        Self {
            current: current.into(),
            legacy: legacy.into(),
            writes: 0,
        }
    }

    pub fn current_path(&self) -> &Path {
        &self.current
    }

    pub fn legacy_path(&self) -> &Path {
        &self.legacy
    }

    /// Successful `save` calls since this handle was created.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    fn read_current_or_legacy(&self) -> Result<ReadResult, SpawnError> {
        let data = read_file(&self.current)?;
        if !data.is_empty() || self.current.exists() {
            return Ok(ReadResult {
                data,
                source: self.current.clone(),
            });
        }
        if self.legacy.exists() {
            let legacy = read_file(&self.legacy)?;
            log::info!("using legacy spawn backup at {:?}", self.legacy);
            return Ok(ReadResult {
                data: legacy,
                source: self.legacy.clone(),
            });
        }
        Ok(ReadResult {
            data,
            source: self.current.clone(),
        })
    }

    /// Find the participant's record for `dimension`.
    ///
    /// Tries the participant id first and, only when `display_name` is not blank, falls
    /// back to a case-insensitive name match. A record from another dimension reads as
    /// absent. Read failures are logged and also read as absent.
    pub fn load(&self, id: ParticipantId, display_name: &str, dimension: &str) -> Option<SpawnRecord> {
        let desired = normalize_name(display_name);
        let result = match self.read_current_or_legacy() {
            Ok(result) => result,
            Err(e) => {
                log::error!("failed to read spawn backup: {}", e);
                return None;
            }
        };

        let entry = result.data.get(&id.to_string()).or_else(|| {
            if desired.is_empty() {
                None
            } else {
                find_by_name(&result.data, desired)
            }
        })?;

        if !entry.is_in(dimension) {
            log::debug!(
                "spawn backup for {} is in {}, not {}; ignoring",
                id,
                entry.dimension,
                dimension
            );
            return None;
        }
        log::info!(
            "loaded spawn backup for {} ({}) from {:?}",
            id,
            escape_log(&entry.name),
            result.source
        );
        Some(entry.clone())
    }

    /// Upsert the participant's record and rewrite the current backup file.
    ///
    /// A blank display name is stored as the participant id. Only the current file is read
    /// and written; legacy entries are never carried over.
    pub fn save(&mut self, id: ParticipantId, display_name: &str, record: &SpawnRecord) -> Result<(), SpawnError> {
        let name = match normalize_name(display_name) {
            "" => id.to_string(),
            trimmed => trimmed.to_string(),
        };
        let mut data = read_file(&self.current)?;
        let mut entry = record.clone();
        entry.name = name;
        data.insert(id.to_string(), entry);
        write_file(&self.current, &data)?;
        self.writes += 1;
        log::info!(
            "wrote spawn backup for {} ({}) to {:?}",
            id,
            escape_log(normalize_name(display_name)),
            self.current
        );
        Ok(())
    }
}

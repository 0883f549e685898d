//! Test utilities & fixtures shared by the integration tests.

use std::collections::VecDeque;
use std::path::Path;

use spawnkeeper::spawn::{BackupStore, OffsetSource};

/// Backup store rooted in a scratch directory, laid out like a real server
/// (`<world>/serverconfig/...` current file, `config/...` legacy file).
#[allow(dead_code)]
pub fn backup_in(root: &Path) -> BackupStore {
    BackupStore::new(
        root.join("world/serverconfig/spawnkeeper/spawns.json"),
        root.join("config/spawnkeeper/spawns.json"),
    )
}

/// Hands out a fixed sequence of offsets (x then z for each try).
#[allow(dead_code)]
pub struct ScriptedOffsets(VecDeque<i32>);

#[allow(dead_code)]
impl ScriptedOffsets {
    pub fn new(offsets: &[i32]) -> Self {
        Self(offsets.iter().copied().collect())
    }

    pub fn remaining(&self) -> usize {
        self.0.len()
    }
}

impl OffsetSource for ScriptedOffsets {
    fn next_offset(&mut self, range: i32) -> i32 {
        let next = self.0.pop_front().expect("offset script exhausted");
        assert!(next.abs() <= range, "scripted offset outside search radius");
        next
    }
}

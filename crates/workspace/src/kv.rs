// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded transactional key/value store (spec §4.1 `KV` / `KVTransaction`).
//!
//! Backed by `redb`. A [`KvTransaction`] stages `set`/`delete` operations in
//! memory; if the same key is staged more than once, the last write wins.
//! `commit` applies the deduplicated ops in one `redb` write transaction, so
//! the store never observes a partial write. If staging is abandoned instead
//! of committed, already-applied side effects (there are none until commit)
//! need no undo; `rollback` exists for callers that want to discard staged
//! ops explicitly and is a no-op against the underlying store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::WorkspaceError;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cairn_kv");

enum Op {
    Set(Vec<u8>),
    Delete,
}

/// A transactional key/value store.
#[derive(Clone)]
pub struct Kv {
    db: Arc<Database>,
}

impl Kv {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let db = Database::create(path).map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        // Ensure the table exists before first read.
        let txn = db.begin_write().map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        {
            let _ = txn.open_table(TABLE).map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        }
        txn.commit().map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WorkspaceError> {
        let txn = self.db.begin_read().map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        let table = txn.open_table(TABLE).map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        Ok(table
            .get(key)
            .map_err(|e| WorkspaceError::Redb(e.to_string()))?
            .map(|v| v.value().to_vec()))
    }

    pub fn set(&self, key: &str, value: &[u8]) -> Result<(), WorkspaceError> {
        let mut txn = self.transaction();
        txn.set(key, value);
        txn.commit()
    }

    pub fn delete(&self, key: &str) -> Result<(), WorkspaceError> {
        let mut txn = self.transaction();
        txn.delete(key);
        txn.commit()
    }

    pub fn list_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, WorkspaceError> {
        let txn = self.db.begin_read().map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        let table = txn.open_table(TABLE).map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(|e| WorkspaceError::Redb(e.to_string()))? {
            let (k, _) = entry.map_err(|e| WorkspaceError::Redb(e.to_string()))?;
            if k.value().starts_with(prefix) {
                keys.push(k.value().to_string());
            }
        }
        Ok(keys)
    }

    pub fn transaction(&self) -> KvTransaction<'_> {
        KvTransaction {
            kv: self,
            ops: Vec::new(),
        }
    }
}

/// A batch of staged writes against a [`Kv`]. See module docs for the
/// last-write-wins-per-key commit semantics.
pub struct KvTransaction<'a> {
    kv: &'a Kv,
    ops: Vec<(String, Op)>,
}

impl<'a> KvTransaction<'a> {
    pub fn set(&mut self, key: impl Into<String>, value: &[u8]) -> &mut Self {
        self.ops.push((key.into(), Op::Set(value.to_vec())));
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push((key.into(), Op::Delete));
        self
    }

    /// Discard all staged ops without touching the store.
    pub fn rollback(&mut self) {
        self.ops.clear();
    }

    /// Apply the deduplicated (last-write-wins) staged ops atomically.
    pub fn commit(self) -> Result<(), WorkspaceError> {
        let mut deduped: HashMap<String, Op> = HashMap::new();
        let mut order = Vec::new();
        for (key, op) in self.ops {
            if !deduped.contains_key(&key) {
                order.push(key.clone());
            }
            deduped.insert(key, op);
        }

        let txn = self
            .kv
            .db
            .begin_write()
            .map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        {
            let mut table = txn.open_table(TABLE).map_err(|e| WorkspaceError::Redb(e.to_string()))?;
            for key in &order {
                let Some(op) = deduped.get(key) else {
                    continue;
                };
                match op {
                    Op::Set(value) => {
                        table
                            .insert(key.as_str(), value.as_slice())
                            .map_err(|e| WorkspaceError::Redb(e.to_string()))?;
                    }
                    Op::Delete => {
                        table
                            .remove(key.as_str())
                            .map_err(|e| WorkspaceError::Redb(e.to_string()))?;
                    }
                }
            }
        }
        txn.commit().map_err(|e| WorkspaceError::Redb(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;

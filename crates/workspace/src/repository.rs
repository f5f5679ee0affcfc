// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic optimistic-concurrency typed repository over a [`Kv`] (spec §4.1,
//! §4.2's CAS semantics).
//!
//! Every record is stored as `{version, value}`. `version == 0` in a `save`
//! call means "this must be a new record"; `version > 0` means "update only
//! if the stored version is exactly this". The version bump on success is
//! derived from the version actually read back from the store, never from
//! the caller's copy — two concurrent savers racing the same expected
//! version can only have one winner, and the loser sees the real stored
//! version in its conflict error.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;
use crate::kv::Kv;

#[derive(Serialize, Deserialize)]
struct Wrapper<T> {
    version: u64,
    value: T,
}

pub struct Repository<T> {
    kv: Kv,
    prefix: String,
    _marker: PhantomData<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(kv: Kv, prefix: impl Into<String>) -> Self {
        Self {
            kv,
            prefix: prefix.into(),
            _marker: PhantomData,
        }
    }

    fn key(&self, id: &str) -> String {
        format!("{}{id}", self.prefix)
    }

    fn read_wrapper(&self, key: &str) -> Result<Option<Wrapper<T>>, WorkspaceError> {
        match self.kv.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load a record and its stored version.
    pub fn load(&self, id: &str) -> Result<Option<(u64, T)>, WorkspaceError> {
        let key = self.key(id);
        Ok(self.read_wrapper(&key)?.map(|w| (w.version, w.value)))
    }

    /// Save under optimistic concurrency control. Returns the new stored
    /// version on success.
    pub fn save(&self, id: &str, value: T, expected_version: u64) -> Result<u64, WorkspaceError> {
        let key = self.key(id);
        let current = self.read_wrapper(&key)?;
        let actual_version = current.as_ref().map(|w| w.version).unwrap_or(0);

        if expected_version == 0 {
            if current.is_some() {
                return Err(WorkspaceError::VersionConflict {
                    key,
                    expected: 0,
                    actual: actual_version,
                });
            }
        } else if expected_version != actual_version {
            return Err(WorkspaceError::VersionConflict {
                key,
                expected: expected_version,
                actual: actual_version,
            });
        }

        let new_version = actual_version + 1;
        let wrapper = Wrapper { version: new_version, value };
        self.kv.set(&key, &serde_json::to_vec(&wrapper)?)?;
        Ok(new_version)
    }

    pub fn delete(&self, id: &str) -> Result<(), WorkspaceError> {
        self.kv.delete(&self.key(id))
    }

    /// All ids currently stored under this repository's prefix.
    pub fn list_ids(&self) -> Result<Vec<String>, WorkspaceError> {
        Ok(self
            .kv
            .list_keys_with_prefix(&self.prefix)?
            .into_iter()
            .map(|key| key.trim_start_matches(&self.prefix).to_string())
            .collect())
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

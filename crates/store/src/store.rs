// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `LifecycleStore`: CAS persistence for [`LifecycleRecord`] (spec §4.2).

use std::path::Path;

use cairn_core::{AgentId, LifecycleRecord};
use cairn_workspace::{Kv, Repository, WorkspaceError};
use tracing::{debug, warn};

use crate::error::StoreError;

pub struct LifecycleStore {
    repo: Repository<LifecycleRecord>,
}

impl LifecycleStore {
    pub fn new(kv: Kv) -> Self {
        Self {
            repo: Repository::new(kv, "lifecycle:"),
        }
    }

    /// Save `record` under optimistic concurrency control on its own
    /// `version` field. Returns the record with its bumped `version`.
    pub fn save(&self, mut record: LifecycleRecord) -> Result<LifecycleRecord, StoreError> {
        let expected = record.version;
        let id = record.agent_id.to_string();
        let new_version = match self.repo.save(&id, record.clone(), expected) {
            Ok(v) => v,
            Err(WorkspaceError::VersionConflict { .. }) => {
                return Err(StoreError::VersionConflict(id));
            }
            Err(other) => return Err(StoreError::Workspace(other)),
        };
        record.version = new_version;
        Ok(record)
    }

    pub fn load(&self, agent_id: &AgentId) -> Result<Option<LifecycleRecord>, StoreError> {
        Ok(self
            .repo
            .load(agent_id.as_str())?
            .map(|(version, mut record)| {
                record.version = version;
                record
            }))
    }

    pub fn delete(&self, agent_id: &AgentId) -> Result<(), StoreError> {
        Ok(self.repo.delete(agent_id.as_str())?)
    }

    pub fn list_all(&self) -> Result<Vec<LifecycleRecord>, StoreError> {
        let mut records = Vec::new();
        for id in self.repo.list_ids()? {
            if let Some((version, mut record)) = self.repo.load(&id)? {
                record.version = version;
                records.push(record);
            }
        }
        Ok(records)
    }

    /// All records whose state is neither ACCEPTED nor REJECTED. ERRORED
    /// records remain "active" here — they still need operator attention —
    /// even though `AgentState::is_terminal` considers them terminal.
    pub fn list_active(&self) -> Result<Vec<LifecycleRecord>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|r| !matches!(r.state, cairn_core::AgentState::Accepted | cairn_core::AgentState::Rejected))
            .collect())
    }

    /// Load, mutate, save — retrying on `VersionConflict` up to `max_attempts`.
    pub fn update_atomic(
        &self,
        agent_id: &AgentId,
        max_attempts: u32,
        mutator: impl Fn(&mut LifecycleRecord),
    ) -> Result<LifecycleRecord, StoreError> {
        for attempt in 0..max_attempts.max(1) {
            let mut record = self
                .load(agent_id)?
                .ok_or_else(|| StoreError::NotFound(agent_id.to_string()))?;
            mutator(&mut record);
            match self.save(record) {
                Ok(saved) => return Ok(saved),
                Err(StoreError::VersionConflict(_)) => {
                    debug!(%agent_id, attempt, "lifecycle CAS retry");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::RetriesExhausted {
            agent_id: agent_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Delete terminal records older than `max_age_seconds` and remove their
    /// trashed workspace files under `agent_storage_dir`.
    pub fn cleanup_old(&self, max_age_seconds: u64, now_ms: u64, agent_storage_dir: &Path) -> Result<usize, StoreError> {
        let threshold_ms = max_age_seconds.saturating_mul(1000);
        let mut removed = 0;
        for record in self.list_all()? {
            if !record.state.is_terminal() {
                continue;
            }
            let age_ms = now_ms.saturating_sub(record.state_changed_at_ms);
            if age_ms < threshold_ms {
                continue;
            }
            let trash_path = agent_storage_dir.join(format!("bin-{}", record.agent_id));
            if let Err(e) = std::fs::remove_dir_all(&trash_path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(agent_id = %record.agent_id, error = %e, "cleanup_old: failed to remove trashed workspace");
                }
            }
            self.delete(&record.agent_id)?;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

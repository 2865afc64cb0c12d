//! The canonical endpoint map.
//!
//! # Responsibilities
//! - Own the name → [`EndpointConfig`] map
//! - Validate and apply add/update/remove/rename
//! - Persist the entire map after every successful mutation
//!
//! # Design Decisions
//! - Copy-on-write: a mutation builds the next map, persists it, and only then
//!   swaps it in, so a failed write leaves the store exactly as it was
//! - Snapshots are handed out as `Arc<Snapshot>` and never change afterwards

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::store::endpoint::{
    validate_name, EndpointChanges, EndpointConfig, EndpointDraft, Snapshot,
};
use crate::store::{persist, StoreError};

pub struct ConfigStore {
    /// Backing file; `None` keeps the store in memory only.
    path: Option<PathBuf>,
    endpoints: Arc<Snapshot>,
}

impl ConfigStore {
    /// Open the store backed by `path`.
    ///
    /// A missing or malformed file is not fatal: the store starts from
    /// `defaults`, which are not written until the first mutation.
    pub fn open(path: impl Into<PathBuf>, defaults: Snapshot) -> Self {
        let path = path.into();
        let endpoints = match persist::read_snapshot(&path) {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    path = %path.display(),
                    endpoints = snapshot.len(),
                    "Loaded endpoint configurations from file"
                );
                snapshot
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No endpoint file found, using defaults");
                defaults
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load endpoint configurations, using defaults"
                );
                defaults
            }
        };

        Self {
            path: Some(path),
            endpoints: Arc::new(endpoints),
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory(initial: Snapshot) -> Self {
        Self {
            path: None,
            endpoints: Arc::new(initial),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_all(&self) -> Arc<Snapshot> {
        Arc::clone(&self.endpoints)
    }

    pub fn get(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoints.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Create a new endpoint. Fails with `Conflict` if the name is taken.
    pub fn add(&mut self, name: &str, draft: EndpointDraft) -> Result<EndpointConfig, StoreError> {
        validate_name(name)?;
        if self.contains(name) {
            return Err(StoreError::Conflict(format!(
                "Endpoint '{}' already exists",
                name
            )));
        }

        let config = draft.validate()?;
        let mut next = self.next();
        next.insert(name.to_string(), config.clone());
        self.commit(next)?;

        tracing::info!(endpoint = %name, method = %config.method, "Endpoint added");
        Ok(config)
    }

    /// Merge `patch` into an existing endpoint and re-validate the result.
    pub fn update(&mut self, name: &str, patch: EndpointDraft) -> Result<EndpointConfig, StoreError> {
        let mut changes = EndpointChanges::new();
        changes.insert(name.to_string(), patch);
        self.update_many(changes)?;

        self.get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    /// Apply several partial updates as one unit.
    ///
    /// Every entry is merged and validated before anything changes; a single
    /// failing entry leaves the store untouched.
    pub fn update_many(&mut self, changes: EndpointChanges) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Err(StoreError::validation("No endpoint changes provided"));
        }

        let mut next = self.next();
        let mut updated = Vec::with_capacity(changes.len());
        for (name, patch) in changes {
            let current = next.get(&name).ok_or_else(|| not_found(&name))?;
            let config = patch.merged_over(current).validate()?;
            updated.push((name.clone(), config.method));
            next.insert(name, config);
        }
        self.commit(next)?;

        for (name, method) in updated {
            tracing::info!(endpoint = %name, method = %method, "Endpoint updated");
        }
        Ok(())
    }

    /// Delete an endpoint, returning its last config.
    pub fn remove(&mut self, name: &str) -> Result<EndpointConfig, StoreError> {
        let mut next = self.next();
        let removed = next.remove(name).ok_or_else(|| not_found(name))?;
        self.commit(next)?;

        tracing::info!(endpoint = %name, "Endpoint removed");
        Ok(removed)
    }

    /// Move a config to a new name, unchanged.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<EndpointConfig, StoreError> {
        if !self.contains(old_name) {
            return Err(StoreError::NotFound(format!(
                "Source endpoint '{}' not found",
                old_name
            )));
        }
        validate_name(new_name)?;
        if self.contains(new_name) {
            return Err(StoreError::Conflict(format!(
                "Target endpoint name '{}' already exists",
                new_name
            )));
        }

        let mut next = self.next();
        let config = next.remove(old_name).ok_or_else(|| not_found(old_name))?;
        next.insert(new_name.to_string(), config.clone());
        self.commit(next)?;

        tracing::info!(from = %old_name, to = %new_name, "Endpoint renamed");
        Ok(config)
    }

    fn next(&self) -> Snapshot {
        Snapshot::clone(&self.endpoints)
    }

    fn commit(&mut self, next: Snapshot) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            persist::write_snapshot(path, &next)?;
        }
        self.endpoints = Arc::new(next);
        Ok(())
    }
}

fn not_found(name: &str) -> StoreError {
    StoreError::NotFound(format!("Endpoint '{}' not found", name))
}

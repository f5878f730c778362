//! Role record store collaborator
//!
//! The store may apply its own row-level authorization filtering to role
//! queries. The resolver switches that filtering off around the dynamic
//! lookup with a [`FilterGuard`], which re-enables it on every exit path.

use super::types::{Role, RoleRecord};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Name of the row-level filter applied by [`InMemoryRoleStore`]
pub const ROW_LEVEL_FILTER: &str = "row_level_acl";

/// Source of stored role records
pub trait RoleRecordStore: Send + Sync {
    /// Find the records whose names match any of `names` exactly
    ///
    /// `names` are normalized (upper-cased).
    fn find_roles_by_name(&self, names: &[String]) -> Result<Vec<RoleRecord>>;

    /// Disable internal row-level filtering
    ///
    /// Returns the filters that were enabled and are now disabled. Filters that
    /// were already disabled are not reported, so nested guards restore only
    /// what they changed.
    fn disable_filters(&self) -> Result<Vec<String>>;

    /// Re-enable filters previously returned by [`disable_filters`](Self::disable_filters)
    fn enable_filters(&self, filters: &[String]) -> Result<()>;
}

/// Scoped suspension of a store's row-level filtering
///
/// Acquiring disables the filters; [`release`](Self::release) or drop
/// re-enables them. Prefer `release` on the success path so a failure to
/// re-enable is reported; drop only logs it.
pub struct FilterGuard<'a> {
    store: &'a dyn RoleRecordStore,
    disabled: Vec<String>,
    released: bool,
}

impl<'a> FilterGuard<'a> {
    pub fn acquire(store: &'a dyn RoleRecordStore) -> Result<Self> {
        let disabled = store.disable_filters()?;
        if !disabled.is_empty() {
            debug!("Disabled store filters: {:?}", disabled);
        }

        Ok(Self {
            store,
            disabled,
            released: false,
        })
    }

    /// Filters this guard disabled
    pub fn disabled(&self) -> &[String] {
        &self.disabled
    }

    /// Re-enable the filters, reporting failure
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        let disabled = std::mem::take(&mut self.disabled);
        self.store.enable_filters(&disabled)
    }
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.store.enable_filters(&self.disabled) {
            warn!("Failed to re-enable store filters {:?}: {}", self.disabled, e);
        }
    }
}

/// In-process [`RoleRecordStore`]
///
/// Records are keyed by normalized name. The store carries a single row-level
/// filter flag and counts queries, which makes the filter guard observable.
#[derive(Debug)]
pub struct InMemoryRoleStore {
    records: DashMap<String, RoleRecord>,
    filter_enabled: AtomicBool,
    queries: AtomicUsize,
    unfiltered_queries: AtomicUsize,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            filter_enabled: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
            unfiltered_queries: AtomicUsize::new(0),
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_record(self, record: RoleRecord) -> Self {
        self.insert(record);
        self
    }

    /// Insert or replace a record
    pub fn insert(&self, record: RoleRecord) {
        self.records.insert(Role::normalize(&record.name), record);
    }

    /// Remove a record by name
    pub fn remove(&self, name: &str) -> Option<RoleRecord> {
        self.records.remove(&Role::normalize(name)).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the row-level filter is currently enabled
    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled.load(Ordering::SeqCst)
    }

    /// Total number of `find_roles_by_name` calls
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of queries executed while the row-level filter was disabled
    pub fn unfiltered_query_count(&self) -> usize {
        self.unfiltered_queries.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleRecordStore for InMemoryRoleStore {
    fn find_roles_by_name(&self, names: &[String]) -> Result<Vec<RoleRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.filter_enabled() {
            self.unfiltered_queries.fetch_add(1, Ordering::SeqCst);
        }

        Ok(names
            .iter()
            .filter_map(|name| self.records.get(&Role::normalize(name)).map(|r| r.clone()))
            .collect())
    }

    fn disable_filters(&self) -> Result<Vec<String>> {
        if self.filter_enabled.swap(false, Ordering::SeqCst) {
            Ok(vec![ROW_LEVEL_FILTER.to_string()])
        } else {
            Ok(Vec::new())
        }
    }

    fn enable_filters(&self, filters: &[String]) -> Result<()> {
        if filters.iter().any(|f| f == ROW_LEVEL_FILTER) {
            self.filter_enabled.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

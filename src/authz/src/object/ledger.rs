//! Change ledger: attach-time snapshots of managed objects

use super::types::{ObjectHandle, ObjectId};
use crate::error::Result;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Old and new value of a changed field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Changed fields of one object, by field name
pub type ChangeSet = BTreeMap<String, FieldChange>;

/// Field values captured at attach time
pub type Snapshot = BTreeMap<String, Value>;

/// Tracks managed objects and their attach-time field values
///
/// Snapshots are never updated after attach; they are the baseline every
/// change set is computed against.
#[derive(Debug, Default)]
pub struct ChangeLedger {
    snapshots: HashMap<ObjectId, Snapshot>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an object
    ///
    /// Returns `false` (and keeps the original snapshot) if the object is
    /// already attached.
    pub fn attach(&mut self, handle: &ObjectHandle) -> Result<bool> {
        if self.snapshots.contains_key(&handle.id()) {
            return Ok(false);
        }

        let snapshot: Snapshot = handle.try_borrow()?.fields().into_iter().collect();
        debug!("Attached object {} ({} fields)", handle.id(), snapshot.len());
        self.snapshots.insert(handle.id(), snapshot);
        Ok(true)
    }

    /// Stop tracking an object; detaching an unknown object is a no-op
    pub fn detach(&mut self, id: ObjectId) -> bool {
        self.snapshots.remove(&id).is_some()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.snapshots.contains_key(&id)
    }

    pub fn snapshot(&self, id: ObjectId) -> Option<&Snapshot> {
        self.snapshots.get(&id)
    }

    /// Fields whose current value differs from the attach-time snapshot
    ///
    /// An object that is not attached has no changes.
    pub fn change_set(&self, handle: &ObjectHandle) -> Result<ChangeSet> {
        let Some(snapshot) = self.snapshots.get(&handle.id()) else {
            return Ok(ChangeSet::new());
        };

        let object = handle.try_borrow()?;
        let mut changes = ChangeSet::new();

        for (name, new) in object.fields() {
            let old = snapshot.get(&name).cloned().unwrap_or(Value::Null);
            if old != new {
                changes.insert(name, FieldChange { old, new });
            }
        }

        Ok(changes)
    }

    /// Stop tracking every object
    pub fn flush(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

//! Filter extension point events
//!
//! The view-granted events let a listener answer in place of the oracle: once
//! a listener calls `set_granted`, the oracle is not consulted.

use super::types::{ObjectHandle, SubjectIdentity};
use serde_json::Value;

/// Dispatched before and after a commit with the queued objects
#[derive(Debug, Clone)]
pub struct CommitEvent {
    pub objects: Vec<ObjectHandle>,
}

/// Whole-object view check
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectViewGrantedEvent {
    pub subject: SubjectIdentity,
    verdict: Option<bool>,
}

impl ObjectViewGrantedEvent {
    pub fn new(subject: SubjectIdentity) -> Self {
        Self {
            subject,
            verdict: None,
        }
    }

    /// Answer the check, bypassing the oracle
    pub fn set_granted(&mut self, granted: bool) {
        self.verdict = Some(granted);
    }

    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }
}

/// Field view check
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViewGrantedEvent {
    pub subject: SubjectIdentity,
    pub field: String,
    verdict: Option<bool>,
}

impl FieldViewGrantedEvent {
    pub fn new(subject: SubjectIdentity, field: impl Into<String>) -> Self {
        Self {
            subject,
            field: field.into(),
            verdict: None,
        }
    }

    /// Answer the check, bypassing the oracle
    pub fn set_granted(&mut self, granted: bool) {
        self.verdict = Some(granted);
    }

    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }
}

/// Whether a changed field may keep its new value
///
/// `granted = true` keeps the change; `false` restores the old value.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreViewGrantedEvent {
    pub subject: SubjectIdentity,
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    verdict: Option<bool>,
}

impl RestoreViewGrantedEvent {
    pub fn new(
        subject: SubjectIdentity,
        field: impl Into<String>,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        Self {
            subject,
            field: field.into(),
            old_value,
            new_value,
            verdict: None,
        }
    }

    /// Answer the check, bypassing the oracle
    pub fn set_granted(&mut self, granted: bool) {
        self.verdict = Some(granted);
    }

    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }
}

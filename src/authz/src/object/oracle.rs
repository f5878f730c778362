//! Authorization oracle collaborator

use super::types::SubjectIdentity;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission asked of the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    View,
    Edit,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Edit => "edit",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a permission is asked about: a whole object or one of its fields
#[derive(Debug, Clone, PartialEq)]
pub enum Vote {
    Object(SubjectIdentity),
    Field {
        subject: SubjectIdentity,
        field: String,
    },
}

impl Vote {
    pub fn field(subject: SubjectIdentity, field: impl Into<String>) -> Self {
        Vote::Field {
            subject,
            field: field.into(),
        }
    }

    pub fn subject(&self) -> &SubjectIdentity {
        match self {
            Vote::Object(subject) => subject,
            Vote::Field { subject, .. } => subject,
        }
    }
}

/// Decides view/edit permissions for the current principal
pub trait AuthorizationOracle {
    fn is_granted(&self, permission: Permission, vote: &Vote) -> Result<bool>;

    /// Batch-prepare decisions for objects about to be checked
    ///
    /// A warm-up hint; the default does nothing.
    fn preload(&self, _subjects: &[SubjectIdentity]) -> Result<()> {
        Ok(())
    }
}

//! Role value types

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A named permission grant
///
/// Names compare case-insensitively; they are stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role {
    name: String,
}

impl Role {
    /// Create a role, rejecting blank names
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if name.trim().is_empty() {
            return Err(AuthzError::InvalidInput(
                "Role name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name: Self::normalize(name),
        })
    }

    /// Trimmed, upper-cased form used for comparison and cache keys
    pub fn normalize(name: &str) -> String {
        name.trim().to_uppercase()
    }

    /// The normalized role name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<String> for Role {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self> {
        Role::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.name
    }
}

/// Role input: either a raw name or an already-built [`Role`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    Name(String),
    Role(Role),
}

impl RoleRef {
    /// Convert into a validated role
    pub fn into_role(self) -> Result<Role> {
        match self {
            RoleRef::Name(name) => Role::new(name),
            RoleRef::Role(role) => Ok(role),
        }
    }
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl From<&String> for RoleRef {
    fn from(name: &String) -> Self {
        RoleRef::Name(name.clone())
    }
}

impl From<Role> for RoleRef {
    fn from(role: Role) -> Self {
        RoleRef::Role(role)
    }
}

impl From<&Role> for RoleRef {
    fn from(role: &Role) -> Self {
        RoleRef::Role(role.clone())
    }
}

/// A role row held by a [`RoleRecordStore`](super::store::RoleRecordStore)
///
/// Parents and children are held by name (non-owning references).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub name: String,

    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub children: Vec<String>,
}

impl RoleRecord {
    /// Create a record without relations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add a child role name
    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Add a parent role name
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    /// Child role names
    pub fn children(&self) -> &[String] {
        &self.children
    }
}

/// Convert role inputs into roles, deduplicated by name (first occurrence wins)
///
/// Fails on the first invalid input without returning a partial result.
pub fn normalize_roles<I, R>(roles: I) -> Result<Vec<Role>>
where
    I: IntoIterator<Item = R>,
    R: Into<RoleRef>,
{
    let mut converted = Vec::new();
    for role in roles {
        converted.push(role.into().into_role()?);
    }
    Ok(dedup_by_name(converted))
}

/// Remove later entries that repeat an earlier role name
pub fn dedup_by_name(roles: Vec<Role>) -> Vec<Role> {
    let mut seen = HashSet::with_capacity(roles.len());
    roles
        .into_iter()
        .filter(|role| seen.insert(role.name.clone()))
        .collect()
}

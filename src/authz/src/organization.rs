//! Organizational context collaborator
//!
//! The current organization salts resolver cache keys so that role sets
//! resolved in one tenant are never served to another.

/// Discriminator used for a principal's personal organization
pub const PERSONAL_DISCRIMINATOR: &str = "user";

/// Supplies the cache-key discriminator of the current organization
pub trait OrganizationalContext {
    /// `None` when no organization is active
    fn current_discriminator(&self) -> Option<String>;
}

/// An organization a principal acts within
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Organization {
    /// The principal's own personal organization
    Personal,
    /// A shared organization, by identifier
    Shared(String),
}

impl Organization {
    pub fn discriminator(&self) -> String {
        match self {
            Organization::Personal => PERSONAL_DISCRIMINATOR.to_string(),
            Organization::Shared(id) => id.clone(),
        }
    }
}

/// Fixed organizational context
#[derive(Debug, Clone, Default)]
pub struct StaticOrganization {
    current: Option<Organization>,
}

impl StaticOrganization {
    pub fn new(current: Option<Organization>) -> Self {
        Self { current }
    }

    pub fn personal() -> Self {
        Self::new(Some(Organization::Personal))
    }

    pub fn shared(id: impl Into<String>) -> Self {
        Self::new(Some(Organization::Shared(id.into())))
    }
}

impl OrganizationalContext for StaticOrganization {
    fn current_discriminator(&self) -> Option<String> {
        self.current.as_ref().map(Organization::discriminator)
    }
}

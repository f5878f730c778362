//! Resolver extension point events

use super::types::Role;

/// Dispatched after the static closure is computed, before the store lookup
///
/// Listeners may replace `roles`. Setting `permission_enabled` to `false`
/// signals that the host's permission subsystem should stay switched off while
/// the resolver queries the role store; the flag is handed to the matching
/// [`PostResolveEvent`] so a listener can switch it back on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreResolveEvent {
    pub roles: Vec<Role>,
    pub permission_enabled: bool,
}

impl PreResolveEvent {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles,
            permission_enabled: true,
        }
    }
}

/// Dispatched with the final, deduplicated result
///
/// Listeners may replace `roles`; the replacement is returned to the caller
/// but not cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResolveEvent {
    pub roles: Vec<Role>,
    pub permission_enabled: bool,
}

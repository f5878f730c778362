//! # Sharegate Authorization
//!
//! Role hierarchy resolution and object-level authorization filtering.
//!
//! ## Features
//!
//! - **Reachable roles**: static `parent -> children` hierarchy merged with stored role records
//! - **Two-level caching**: request-scoped LRU plus an optional shared durable cache
//! - **Tenant-salted keys**: cache keys prefixed by the current organization
//! - **Object filtering**: nulls out fields the principal cannot view
//! - **Change restoration**: reverts fields changed without edit permission
//! - **Transactions**: batch filter/restore work and apply it on commit
//! - **Extension points**: prioritized listeners around resolution and filtering
//!
//! ## Example
//!
//! ```rust
//! use sharegate_authz::config::ResolverConfig;
//! use sharegate_authz::roles::{InMemoryRoleStore, RoleHierarchyResolver, RoleRecord};
//! use std::sync::Arc;
//!
//! # fn example() -> sharegate_authz::Result<()> {
//! let store = InMemoryRoleStore::new()
//!     .with_record(RoleRecord::new("ROLE_ADMIN").with_child("ROLE_AUDITOR"));
//! let config = ResolverConfig::default().with_hierarchy("ROLE_ADMIN", ["ROLE_MANAGER"]);
//! let mut resolver = RoleHierarchyResolver::new(&config, Arc::new(store))?;
//!
//! let reachable = resolver.get_reachable_roles(["role_admin"])?;
//! let names: Vec<&str> = reachable.iter().map(|r| r.name()).collect();
//! assert_eq!(names, vec!["ROLE_ADMIN", "ROLE_MANAGER", "ROLE_AUDITOR"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod object;
pub mod organization;
pub mod roles;

// Re-export commonly used types
pub use config::{AuthzConfig, FilterConfig, ResolverConfig};
pub use error::{AuthzError, Result};
pub use events::EventBus;
pub use object::{AuthorizationOracle, ChangeLedger, ObjectFilter, ObjectHandle, Record};
pub use organization::{Organization, OrganizationalContext, StaticOrganization};
pub use roles::{CacheStats, RoleHierarchyResolver, Role, RoleRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Reachable-role resolution
//!
//! Expands declared roles into the full set they grant through the configured
//! hierarchy and stored role records, with request-scoped and durable caching
//! and pre/post extension points.
//!
//! # Features
//!
//! - **Static hierarchy**: transitive `parent -> children` expansion from configuration
//! - **Stored records**: children of matching records resolved recursively
//! - **Two-level caching**: LRU execution cache, optional shared durable cache
//! - **Tenant salting**: cache keys prefixed by the organizational discriminator
//! - **Cycle tolerance**: stored cycles are cut at the first revisited record

pub mod cache;
pub mod events;
pub mod hierarchy;
pub mod resolver;
pub mod store;
pub mod types;


pub use cache::{CacheStats, DurableCache, ExecutionCache, InMemoryDurableCache};
pub use events::{PostResolveEvent, PreResolveEvent};
pub use hierarchy::StaticHierarchy;
pub use resolver::RoleHierarchyResolver;
pub use store::{FilterGuard, InMemoryRoleStore, RoleRecordStore};
pub use types::{Role, RoleRecord, RoleRef};

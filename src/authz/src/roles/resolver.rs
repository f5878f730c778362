//! Reachable-role resolver
//!
//! Expands a principal's roles into every role they transitively grant,
//! combining:
//!
//! - **StaticHierarchy**: the configured `parent -> children` map
//! - **RoleRecordStore**: stored records whose children are resolved recursively
//! - **ExecutionCache / DurableCache**: results keyed by the normalized role set
//!
//! # Example
//!
//! ```rust
//! use sharegate_authz::config::ResolverConfig;
//! use sharegate_authz::roles::{InMemoryRoleStore, RoleHierarchyResolver};
//! use std::sync::Arc;
//!
//! # fn example() -> sharegate_authz::Result<()> {
//! let config = ResolverConfig::default().with_hierarchy("ROLE_ADMIN", ["ROLE_USER"]);
//! let mut resolver = RoleHierarchyResolver::new(&config, Arc::new(InMemoryRoleStore::new()))?;
//!
//! let reachable = resolver.get_reachable_roles(["ROLE_ADMIN"])?;
//! let names: Vec<&str> = reachable.iter().map(|r| r.name()).collect();
//! assert_eq!(names, vec!["ROLE_ADMIN", "ROLE_USER"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use super::cache::{
    cache_key, decode_roles, encode_roles, CacheStats, DurableCache, ExecutionCache,
};
use super::events::{PostResolveEvent, PreResolveEvent};
use super::hierarchy::StaticHierarchy;
use super::store::{FilterGuard, RoleRecordStore};
use super::types::{dedup_by_name, normalize_roles, Role, RoleRef};
use crate::config::ResolverConfig;
use crate::error::{AuthzError, Result};
use crate::events::EventBus;
use crate::organization::OrganizationalContext;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of resolving one role set
struct Resolution {
    roles: Vec<Role>,
    /// Records whose expansion was cut because they were already being
    /// expanded higher up; non-empty means `roles` is incomplete
    cut: HashSet<String>,
}

impl Resolution {
    fn complete(roles: Vec<Role>) -> Self {
        Self {
            roles,
            cut: HashSet::new(),
        }
    }
}

/// Resolves the transitive closure of a role set
///
/// The resolver owns its execution cache and is meant to live for one request
/// (or to be cleared with [`clear_execution_cache`](Self::clear_execution_cache)
/// between requests). Only the durable cache is shared.
pub struct RoleHierarchyResolver {
    hierarchy: StaticHierarchy,
    store: Arc<dyn RoleRecordStore>,
    durable_cache: Option<Arc<dyn DurableCache>>,
    organization: Option<Arc<dyn OrganizationalContext>>,
    execution_cache: ExecutionCache,
    salt_with_organization: bool,
    pre_resolve: EventBus<PreResolveEvent>,
    post_resolve: EventBus<PostResolveEvent>,
    stats: CacheStats,
}

impl RoleHierarchyResolver {
    /// Create a resolver over the configured hierarchy and a role store
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid.
    pub fn new(config: &ResolverConfig, store: Arc<dyn RoleRecordStore>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            hierarchy: StaticHierarchy::from_config(&config.hierarchy)?,
            store,
            durable_cache: None,
            organization: None,
            execution_cache: ExecutionCache::new(config.execution_cache_capacity),
            salt_with_organization: config.cache_key_prefix_enabled,
            pre_resolve: EventBus::new(),
            post_resolve: EventBus::new(),
            stats: CacheStats::default(),
        })
    }

    /// Attach a durable cache consulted after the execution cache
    pub fn with_durable_cache(mut self, cache: Arc<dyn DurableCache>) -> Self {
        self.durable_cache = Some(cache);
        self
    }

    /// Attach the organizational context used to salt cache keys
    pub fn with_organization(mut self, organization: Arc<dyn OrganizationalContext>) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Register a pre-resolve listener
    pub fn on_pre_resolve<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut PreResolveEvent) -> ControlFlow<()> + 'static,
    {
        self.pre_resolve.subscribe(priority, listener);
    }

    /// Register a post-resolve listener
    pub fn on_post_resolve<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut PostResolveEvent) -> ControlFlow<()> + 'static,
    {
        self.post_resolve.subscribe(priority, listener);
    }

    /// Resolve every role reachable from `roles`
    ///
    /// The result contains each input role plus everything it grants through
    /// the static hierarchy and stored records, one entry per name, in
    /// first-seen order.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if any role name is blank (nothing is resolved)
    /// - store and durable cache failures are propagated
    pub fn get_reachable_roles<I, R>(&mut self, roles: I) -> Result<Vec<Role>>
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleRef>,
    {
        let roles = normalize_roles(roles)?;
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let mut expanding = Vec::new();
        let resolution = self.resolve(roles, &mut expanding)?;
        Ok(resolution.roles)
    }

    /// Expand `roles` through the static hierarchy only
    ///
    /// Bypasses both caches and the role store.
    pub fn get_config_reachable_roles<I, R>(&self, roles: I) -> Result<Vec<Role>>
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleRef>,
    {
        let roles = normalize_roles(roles)?;
        Ok(self.hierarchy.reachable(&roles))
    }

    /// Cache key under which the result for `roles` is stored
    pub fn cache_key_for<I, R>(&self, roles: I) -> Result<String>
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleRef>,
    {
        let roles = normalize_roles(roles)?;
        Ok(self.compute_key(&roles))
    }

    fn compute_key(&self, roles: &[Role]) -> String {
        let prefix = if self.salt_with_organization {
            self.organization
                .as_ref()
                .and_then(|org| org.current_discriminator())
        } else {
            None
        };

        cache_key(roles, prefix.as_deref())
    }

    fn resolve(&mut self, roles: Vec<Role>, expanding: &mut Vec<String>) -> Result<Resolution> {
        let key = self.compute_key(&roles);

        if let Some(cached) = self.execution_cache.get(&key) {
            self.stats.execution_hits += 1;
            debug!("Execution cache hit for {}", key);
            return Ok(Resolution::complete(cached));
        }

        if let Some(cached) = self.read_durable(&key)? {
            self.stats.durable_hits += 1;
            debug!("Durable cache hit for {}", key);
            self.execution_cache.put(key, cached.clone());
            return Ok(Resolution::complete(cached));
        }

        self.stats.misses += 1;

        let mut pre = PreResolveEvent::new(self.hierarchy.reachable(&roles));
        self.pre_resolve.dispatch(&mut pre);
        let PreResolveEvent {
            roles: mut working,
            permission_enabled,
        } = pre;

        let cut = self.expand_stored(&roles, &mut working, expanding)?;
        let reachable = dedup_by_name(working);

        if cut.is_empty() {
            self.write_durable(&key, &reachable)?;
            self.execution_cache.put(key, reachable.clone());
        } else {
            debug!("Not caching {}: expansion cut at {:?}", key, cut);
        }

        let mut post = PostResolveEvent {
            roles: reachable,
            permission_enabled,
        };
        self.post_resolve.dispatch(&mut post);

        Ok(Resolution {
            roles: post.roles,
            cut,
        })
    }

    /// Query stored records for the input names and merge their children's closures
    ///
    /// Returns the names cut by this subtree that are still open above it.
    fn expand_stored(
        &mut self,
        roles: &[Role],
        working: &mut Vec<Role>,
        expanding: &mut Vec<String>,
    ) -> Result<HashSet<String>> {
        let store = Arc::clone(&self.store);
        let guard = FilterGuard::acquire(store.as_ref())?;

        let names: Vec<String> = roles.iter().map(|r| r.name().to_string()).collect();
        let records = store.find_roles_by_name(&names)?;
        debug!("Role store returned {} record(s) for {:?}", records.len(), names);

        let mut cut = HashSet::new();
        for record in records {
            let name = Role::normalize(&record.name);
            if expanding.contains(&name) {
                warn!("Role cycle detected at {}: {:?}", name, expanding);
                cut.insert(name);
                continue;
            }

            let mut children = Vec::with_capacity(record.children().len());
            for child in record.children() {
                children.push(Role::new(child).map_err(|_| {
                    AuthzError::Store(format!("Role record '{}' has an empty child name", record.name))
                })?);
            }
            let children = dedup_by_name(children);
            if children.is_empty() {
                continue;
            }

            expanding.push(name.clone());
            let child = self.resolve(children, expanding);
            expanding.pop();
            let child = child?;

            working.extend(child.roles);
            cut.extend(child.cut);
            cut.remove(&name);
        }

        guard.release()?;
        Ok(cut)
    }

    fn read_durable(&self, key: &str) -> Result<Option<Vec<Role>>> {
        let Some(cache) = &self.durable_cache else {
            return Ok(None);
        };

        match cache.get(key)? {
            Some(payload) => match decode_roles(&payload) {
                Ok(roles) => Ok(Some(dedup_by_name(roles))),
                Err(e) => {
                    warn!("Ignoring corrupt durable cache entry {}: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn write_durable(&self, key: &str, roles: &[Role]) -> Result<()> {
        if let Some(cache) = &self.durable_cache {
            cache.set(key, encode_roles(roles)?)?;
        }
        Ok(())
    }

    /// Clear the execution cache (request boundary)
    pub fn clear_execution_cache(&mut self) {
        self.execution_cache.clear();
    }

    /// Cache statistics since construction
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            execution_entries: self.execution_cache.len(),
            execution_capacity: self.execution_cache.capacity(),
            ..self.stats.clone()
        }
    }

    /// The configured static hierarchy
    pub fn hierarchy(&self) -> &StaticHierarchy {
        &self.hierarchy
    }
}

//! Static role hierarchy from configuration
//!
//! The configured hierarchy maps a parent role to the roles it grants. The map
//! is expanded once at construction into the full transitive set for every
//! parent, so lookups at resolution time are a single map read.

use super::types::{dedup_by_name, Role};
use crate::error::{AuthzError, Result};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Transitively expanded configuration hierarchy
#[derive(Debug, Clone, Default)]
pub struct StaticHierarchy {
    /// Parent role name -> every role reachable from it (excluding itself)
    map: HashMap<String, Vec<String>>,
}

impl StaticHierarchy {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the hierarchy from `parent -> [children]` configuration
    ///
    /// Names are normalized. Cycles in the configuration terminate: a role is
    /// visited at most once per parent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any role name is blank.
    pub fn from_config(hierarchy: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();

        for (parent, children) in hierarchy {
            if parent.trim().is_empty() {
                return Err(AuthzError::Configuration(
                    "Role hierarchy contains an empty parent role name".to_string(),
                ));
            }

            let entry = edges.entry(Role::normalize(parent)).or_default();
            for child in children {
                if child.trim().is_empty() {
                    return Err(AuthzError::Configuration(format!(
                        "Role hierarchy entry '{}' contains an empty child role name",
                        parent
                    )));
                }
                let child = Role::normalize(child);
                if !entry.contains(&child) {
                    entry.push(child);
                }
            }
        }

        let mut map = HashMap::with_capacity(edges.len());
        for (parent, children) in &edges {
            map.insert(parent.clone(), Self::expand(parent, children, &edges));
        }

        Ok(Self { map })
    }

    /// Breadth-first expansion of one parent
    fn expand(
        parent: &str,
        children: &[String],
        edges: &HashMap<String, Vec<String>>,
    ) -> Vec<String> {
        let mut reachable = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(parent);

        let mut queue: VecDeque<&String> = children.iter().collect();
        while let Some(role) = queue.pop_front() {
            if !visited.insert(role.as_str()) {
                continue;
            }
            reachable.push(role.clone());

            if let Some(grand_children) = edges.get(role) {
                queue.extend(grand_children.iter());
            }
        }

        reachable
    }

    /// Roles reachable from `name`, excluding `name` itself
    pub fn children_of(&self, name: &str) -> &[String] {
        self.map
            .get(&Role::normalize(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Expand roles through the hierarchy
    ///
    /// Each input role is followed by the roles it grants. The result is
    /// deduplicated by name, first occurrence wins.
    pub fn reachable(&self, roles: &[Role]) -> Vec<Role> {
        let mut reachable = Vec::with_capacity(roles.len());

        for role in roles {
            reachable.push(role.clone());
            if let Some(children) = self.map.get(role.name()) {
                // Names were validated in from_config
                reachable.extend(children.iter().filter_map(|c| Role::new(c).ok()));
            }
        }

        dedup_by_name(reachable)
    }

    /// Names reachable from the given names (including themselves)
    pub fn reachable_names(&self, names: &[&str]) -> Vec<String> {
        let roles: Vec<Role> = names.iter().filter_map(|n| Role::new(n).ok()).collect();
        self.reachable(&roles)
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Number of parent roles in the hierarchy
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no hierarchy is configured
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

//! Configuration loading and validation

use crate::error::{AuthzError, Result};
use crate::roles::cache::DEFAULT_EXECUTION_CAPACITY;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Complete configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthzConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

/// Reachable-role resolver settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Static hierarchy: parent role -> granted roles
    #[serde(default)]
    pub hierarchy: BTreeMap<String, Vec<String>>,

    /// Role sets kept in the execution cache
    #[serde(default = "default_execution_cache_capacity")]
    pub execution_cache_capacity: usize,

    /// Entry lifetime for the bundled in-memory durable cache (`None` = never expires)
    #[serde(default = "default_durable_cache_ttl")]
    pub durable_cache_ttl_secs: Option<u64>,

    /// Salt cache keys with the organizational discriminator
    #[serde(default = "default_true")]
    pub cache_key_prefix_enabled: bool,
}

/// Object filter settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    /// Field names guarded from redaction when they hold the object's identifier
    #[serde(default = "default_identifier_fields")]
    pub identifier_fields: Vec<String>,
}

fn default_execution_cache_capacity() -> usize {
    DEFAULT_EXECUTION_CAPACITY
}

fn default_durable_cache_ttl() -> Option<u64> {
    Some(300)
}

fn default_true() -> bool {
    true
}

fn default_identifier_fields() -> Vec<String> {
    vec!["id".to_string(), "objectIdentifier".to_string()]
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hierarchy: BTreeMap::new(),
            execution_cache_capacity: default_execution_cache_capacity(),
            durable_cache_ttl_secs: default_durable_cache_ttl(),
            cache_key_prefix_enabled: true,
        }
    }
}

impl ResolverConfig {
    /// Add a `parent -> children` hierarchy entry
    pub fn with_hierarchy<I, S>(mut self, parent: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hierarchy
            .entry(parent.into())
            .or_default()
            .extend(children.into_iter().map(Into::into));
        self
    }

    pub fn durable_cache_ttl(&self) -> Option<Duration> {
        self.durable_cache_ttl_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.execution_cache_capacity == 0 {
            return Err(AuthzError::Configuration(
                "resolver.execution_cache_capacity must be at least 1".to_string(),
            ));
        }

        for (parent, children) in &self.hierarchy {
            if parent.trim().is_empty() || children.iter().any(|c| c.trim().is_empty()) {
                return Err(AuthzError::Configuration(format!(
                    "resolver.hierarchy entry '{}' contains an empty role name",
                    parent
                )));
            }
        }

        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            identifier_fields: default_identifier_fields(),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.identifier_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AuthzError::Configuration(
                "filter.identifier_fields contains an empty field name".to_string(),
            ));
        }
        Ok(())
    }
}

impl AuthzConfig {
    /// Parse and validate JSON configuration
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: AuthzConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()?;
        self.filter.validate()
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<AuthzConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    AuthzConfig::from_json_str(&text)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AuthzConfig::default();
        assert_eq!(config.resolver.execution_cache_capacity, 1_000);
        assert_eq!(config.resolver.durable_cache_ttl(), Some(Duration::from_secs(300)));
        assert!(config.resolver.cache_key_prefix_enabled);
        assert_eq!(config.filter.identifier_fields, vec!["id", "objectIdentifier"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_json() {
        let config = AuthzConfig::from_json_str(
            r#"{ "resolver": { "hierarchy": { "ROLE_ADMIN": ["ROLE_USER"] } } }"#,
        )
        .unwrap();

        assert_eq!(config.resolver.hierarchy["ROLE_ADMIN"], vec!["ROLE_USER"]);
        assert_eq!(config.resolver.execution_cache_capacity, 1_000);
        assert_eq!(config.filter.identifier_fields.len(), 2);
    }

    #[test]
    fn test_validation_errors() {
        let config = ResolverConfig {
            execution_cache_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AuthzError::Configuration(_))));

        let config = ResolverConfig::default().with_hierarchy("ROLE_ADMIN", [""]);
        assert!(matches!(config.validate(), Err(AuthzError::Configuration(_))));

        let config = FilterConfig {
            identifier_fields: vec![" ".to_string()],
        };
        assert!(matches!(config.validate(), Err(AuthzError::Configuration(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "resolver": {{ "execution_cache_capacity": 16, "durable_cache_ttl_secs": null }},
                "filter": {{ "identifier_fields": ["uuid"] }} }}"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.resolver.execution_cache_capacity, 16);
        assert_eq!(config.resolver.durable_cache_ttl(), None);
        assert_eq!(config.filter.identifier_fields, vec!["uuid"]);
    }

    #[test]
    fn test_load_config_reports_path() {
        let err = load_config("/nonexistent/authz.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/authz.json"));
    }
}

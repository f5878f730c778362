//! Integration tests for the object filter
//!
//! A request lifecycle: reachable roles feed a role-based oracle, list results
//! are filtered in one transaction, and an update is restored before saving.

use proptest::prelude::*;
use serde_json::{json, Value};
use sharegate_authz::config::{FilterConfig, ResolverConfig};
use sharegate_authz::error::AuthzError;
use sharegate_authz::object::{
    AuthorizationOracle, Filterable, ObjectFilter, ObjectHandle, Permission, Record,
    SubjectIdentity, Vote,
};
use sharegate_authz::roles::{InMemoryRoleStore, RoleHierarchyResolver, RoleRecord};
use sharegate_authz::Result;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Grants by required role per (subject type, field, permission)
struct RoleOracle {
    granted_roles: HashSet<String>,
    object_view: HashMap<String, String>,
    field_rules: HashMap<(String, String, Permission), String>,
    checks: Cell<usize>,
    preloads: Cell<usize>,
}

impl RoleOracle {
    fn new(granted_roles: impl IntoIterator<Item = String>) -> Self {
        Self {
            granted_roles: granted_roles.into_iter().collect(),
            object_view: HashMap::new(),
            field_rules: HashMap::new(),
            checks: Cell::new(0),
            preloads: Cell::new(0),
        }
    }

    fn require_for_object(mut self, subject_type: &str, role: &str) -> Self {
        self.object_view.insert(subject_type.to_string(), role.to_string());
        self
    }

    fn require_for_field(
        mut self,
        subject_type: &str,
        field: &str,
        permission: Permission,
        role: &str,
    ) -> Self {
        self.field_rules.insert(
            (subject_type.to_string(), field.to_string(), permission),
            role.to_string(),
        );
        self
    }

    fn has(&self, role: Option<&String>) -> bool {
        role.map_or(true, |role| self.granted_roles.contains(role))
    }
}

impl AuthorizationOracle for RoleOracle {
    fn is_granted(&self, permission: Permission, vote: &Vote) -> Result<bool> {
        self.checks.set(self.checks.get() + 1);

        Ok(match vote {
            Vote::Object(subject) => {
                permission != Permission::View
                    || self.has(self.object_view.get(&subject.subject_type))
            }
            Vote::Field { subject, field } => self.has(self.field_rules.get(&(
                subject.subject_type.clone(),
                field.clone(),
                permission,
            ))),
        })
    }

    fn preload(&self, _subjects: &[SubjectIdentity]) -> Result<()> {
        self.preloads.set(self.preloads.get() + 1);
        Ok(())
    }
}

/// Typed host object implementing the field capability directly
#[derive(Debug, Clone)]
struct Invoice {
    id: u64,
    customer: String,
    amount: Option<f64>,
    line_items: Vec<String>,
}

impl Filterable for Invoice {
    fn subject_type(&self) -> &str {
        "invoice"
    }

    fn identifier(&self) -> Option<Value> {
        Some(json!(self.id))
    }

    fn field_names(&self) -> Vec<String> {
        ["id", "customer", "amount", "line_items"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(json!(self.id)),
            "customer" => Some(json!(self.customer)),
            "amount" => Some(json!(self.amount)),
            "line_items" => Some(json!(self.line_items)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let invalid = |reason: &str| AuthzError::Field {
            subject: "invoice".to_string(),
            field: name.to_string(),
            reason: reason.to_string(),
        };

        match name {
            "customer" => {
                self.customer = value.as_str().map(str::to_string).unwrap_or_default();
            }
            "amount" => self.amount = value.as_f64(),
            "line_items" => {
                self.line_items = serde_json::from_value(value)
                    .map_err(|e| invalid(&e.to_string()))?;
            }
            "id" => return Err(invalid("identifier is read-only")),
            _ => return Err(invalid("unknown field")),
        }
        Ok(())
    }
}

fn invoice(id: u64) -> ObjectHandle {
    ObjectHandle::new(Invoice {
        id,
        customer: format!("customer-{}", id),
        amount: Some(120.0),
        line_items: vec!["consulting".to_string()],
    })
}

fn reachable_roles(declared: &[&str]) -> Vec<String> {
    let store = InMemoryRoleStore::new()
        .with_record(RoleRecord::new("ROLE_ACCOUNTANT").with_child("ROLE_BILLING_READER"));
    let config = ResolverConfig::default()
        .with_hierarchy("ROLE_ADMIN", ["ROLE_ACCOUNTANT", "ROLE_BILLING_READER"]);
    let mut resolver = RoleHierarchyResolver::new(&config, Arc::new(store)).unwrap();

    resolver
        .get_reachable_roles(declared.iter().copied())
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect()
}

fn billing_oracle(declared: &[&str]) -> RoleOracle {
    RoleOracle::new(reachable_roles(declared))
        .require_for_object("invoice", "ROLE_BILLING_READER")
        .require_for_field("invoice", "amount", Permission::View, "ROLE_ACCOUNTANT")
        .require_for_field("invoice", "amount", Permission::Edit, "ROLE_ADMIN")
        .require_for_field("invoice", "customer", Permission::Edit, "ROLE_ACCOUNTANT")
}

// ============================================================================
// Request lifecycle
// ============================================================================

#[test]
fn test_list_filtered_in_one_transaction() {
    init_tracing();
    let oracle = Arc::new(billing_oracle(&["ROLE_BILLING_READER"]));
    let mut filter = ObjectFilter::new(&FilterConfig::default(), oracle.clone()).unwrap();
    let invoices: Vec<ObjectHandle> = (1..=3).map(invoice).collect();

    filter.begin_transaction();
    for handle in &invoices {
        filter.filter(handle).unwrap();
    }
    assert_eq!(oracle.checks.get(), 0);
    filter.commit().unwrap();

    assert_eq!(oracle.preloads.get(), 1);
    for (i, handle) in invoices.iter().enumerate() {
        assert_eq!(handle.field("id"), json!(i as u64 + 1));
        assert_eq!(handle.field("customer"), json!(format!("customer-{}", i + 1)));
        assert_eq!(handle.field("amount"), Value::Null);
        assert_eq!(handle.field("line_items"), json!(["consulting"]));
    }
}

#[test]
fn test_inherited_role_sees_everything() {
    let oracle = Arc::new(billing_oracle(&["ROLE_ADMIN"]));
    let mut filter = ObjectFilter::new(&FilterConfig::default(), oracle).unwrap();
    let handle = invoice(9);

    filter.filter(&handle).unwrap();
    assert_eq!(handle.field("amount"), json!(120.0));
}

#[test]
fn test_unrelated_role_gets_empty_shell() {
    let oracle = Arc::new(billing_oracle(&["ROLE_SUPPORT"]));
    let mut filter = ObjectFilter::new(&FilterConfig::default(), oracle).unwrap();
    let handle = invoice(5);

    filter.filter(&handle).unwrap();

    assert_eq!(handle.field("id"), json!(5));
    // Typed fields map the null-equivalent onto their own empty value
    assert_eq!(handle.field("customer"), json!(""));
    assert_eq!(handle.field("amount"), Value::Null);
    assert_eq!(handle.field("line_items"), json!([]));
}

#[test]
fn test_update_restores_fields_without_edit() {
    init_tracing();
    let oracle = Arc::new(billing_oracle(&["ROLE_ACCOUNTANT"]));
    let mut filter = ObjectFilter::new(&FilterConfig::default(), oracle).unwrap();
    let handle = invoice(7);

    // Loaded for the request, then the client payload is applied
    filter.filter(&handle).unwrap();
    handle.set_field("customer", json!("Globex")).unwrap();
    handle.set_field("amount", json!(0.0)).unwrap();
    filter.restore(&handle).unwrap();

    assert_eq!(handle.field("customer"), json!("Globex"));
    assert_eq!(handle.field("amount"), json!(120.0));

    let changes = filter.ledger().change_set(&handle).unwrap();
    assert_eq!(changes.keys().collect::<Vec<_>>(), vec!["customer"]);
}

#[test]
fn test_identifier_field_guarded_only_for_own_identifier() {
    let oracle = Arc::new(RoleOracle::new(Vec::new()).require_for_object("invoice", "ROLE_NONE"));
    let config = FilterConfig {
        identifier_fields: vec!["id".to_string(), "number".to_string()],
    };
    let mut filter = ObjectFilter::new(&config, oracle).unwrap();

    let handle = ObjectHandle::new(
        Record::new("invoice")
            .with_identifier_field("number")
            .with_field("number", "INV-1")
            .with_field("id", 3),
    );
    filter.filter(&handle).unwrap();

    assert_eq!(handle.field("number"), json!("INV-1"));
    assert_eq!(handle.field("id"), Value::Null);
}

#[test]
fn test_restore_of_changed_identifier() {
    let oracle = Arc::new(RoleOracle::new(Vec::new()).require_for_field(
        "invoice",
        "id",
        Permission::Edit,
        "ROLE_NONE",
    ));
    let mut filter = ObjectFilter::new(&FilterConfig::default(), oracle).unwrap();
    let handle = ObjectHandle::new(Record::new("invoice").with_field("id", 1));

    filter.ledger_mut().attach(&handle).unwrap();
    handle.set_field("id", json!(2)).unwrap();
    filter.restore(&handle).unwrap();

    assert_eq!(handle.field("id"), json!(1));
}

#[test]
fn test_rejected_write_propagates() {
    let oracle = Arc::new(RoleOracle::new(Vec::new()).require_for_object("invoice", "ROLE_NONE"));
    let config = FilterConfig {
        identifier_fields: Vec::new(),
    };
    let mut filter = ObjectFilter::new(&config, oracle).unwrap();
    let handle = invoice(4);

    // Without the identifier guard the read-only `id` is redacted too
    let result = filter.filter(&handle);
    assert!(matches!(result, Err(AuthzError::Field { ref field, .. }) if field == "id"));
    assert_eq!(filter.pending(), 0);
}

// ============================================================================
// PROPERTY-BASED TESTS (PROPTEST)
// ============================================================================

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(|s| json!(s)),
        prop::collection::vec("[a-z]{1,4}", 0..3).prop_map(|v| json!(v)),
        prop::collection::btree_map("[a-z]{1,4}", any::<bool>(), 0..3).prop_map(|m| json!(m)),
    ]
}

proptest! {
    #[test]
    fn test_filtering_twice_equals_filtering_once(
        fields in prop::collection::btree_map("[a-z]{1,6}", field_value(), 1..6),
        denied in prop::collection::hash_set("[a-z]{1,6}", 0..4),
        object_denied in any::<bool>(),
    ) {
        let mut oracle = RoleOracle::new(Vec::new());
        if object_denied {
            oracle = oracle.require_for_object("doc", "ROLE_NONE");
        }
        for field in &denied {
            oracle = oracle.require_for_field("doc", field, Permission::View, "ROLE_NONE");
        }
        let mut filter = ObjectFilter::new(&FilterConfig::default(), Arc::new(oracle)).unwrap();

        let record = fields
            .iter()
            .fold(Record::new("doc").with_field("id", 1), |r, (k, v)| r.with_field(k.clone(), v.clone()));
        let handle = ObjectHandle::new(record);

        filter.filter(&handle).unwrap();
        let once: BTreeMap<String, Value> = handle.borrow().fields().into_iter().collect();
        filter.filter(&handle).unwrap();
        let twice: BTreeMap<String, Value> = handle.borrow().fields().into_iter().collect();

        prop_assert_eq!(once, twice);
    }
}

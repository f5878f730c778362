//! Object-level authorization filter
//!
//! Walks objects through the [`Filterable`] capability, nulls out fields the
//! principal cannot view, and restores fields changed without edit
//! permission, consulting an [`AuthorizationOracle`] and a [`ChangeLedger`].
//!
//! # Example
//!
//! ```rust
//! use sharegate_authz::config::FilterConfig;
//! use sharegate_authz::object::{
//!     AuthorizationOracle, ObjectFilter, ObjectHandle, Permission, Record, Vote,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct DenyAll;
//!
//! impl AuthorizationOracle for DenyAll {
//!     fn is_granted(&self, _: Permission, _: &Vote) -> sharegate_authz::Result<bool> {
//!         Ok(false)
//!     }
//! }
//!
//! # fn example() -> sharegate_authz::Result<()> {
//! let mut filter = ObjectFilter::new(&FilterConfig::default(), Arc::new(DenyAll))?;
//! let invoice = ObjectHandle::new(
//!     Record::new("invoice").with_field("id", 42).with_field("secret", "x"),
//! );
//!
//! filter.filter(&invoice)?;
//!
//! assert_eq!(invoice.field("id"), json!(42));
//! assert_eq!(invoice.field("secret"), json!(null));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod events;
pub mod filter;
pub mod ledger;
pub mod oracle;
pub mod redaction;
pub mod types;


pub use events::{CommitEvent, FieldViewGrantedEvent, ObjectViewGrantedEvent, RestoreViewGrantedEvent};
pub use filter::ObjectFilter;
pub use ledger::{ChangeLedger, ChangeSet, FieldChange};
pub use oracle::{AuthorizationOracle, Permission, Vote};
pub use redaction::{EmptyCollectionRule, NullRule, RedactionRule, RedactionRuleSet};
pub use types::{Filterable, ObjectHandle, ObjectId, Record, SubjectIdentity};

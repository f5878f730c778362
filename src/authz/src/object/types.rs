//! Filterable objects and their handles

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Opaque per-instance identity
///
/// Assigned when a handle is created; every clone of the handle shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Field access capability for objects the filter can redact and restore
///
/// Values are exchanged as `serde_json::Value`; `Value::Null` is the
/// null-equivalent written by redaction.
pub trait Filterable {
    /// Type name of the object (e.g. `"invoice"`)
    fn subject_type(&self) -> &str;

    /// The object's own identifier, if it has one
    fn identifier(&self) -> Option<Value>;

    /// Names of every field, identifier fields included
    fn field_names(&self) -> Vec<String>;

    /// Current value of a field
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Overwrite a field
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    /// Every field with its current value
    fn fields(&self) -> Vec<(String, Value)> {
        self.field_names()
            .into_iter()
            .map(|name| {
                let value = self.get_field(&name).unwrap_or(Value::Null);
                (name, value)
            })
            .collect()
    }
}

/// Identity of an object as seen by the authorization oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectIdentity {
    pub subject_type: String,
    pub identifier: Option<Value>,
}

impl SubjectIdentity {
    pub fn new(subject_type: impl Into<String>, identifier: Option<Value>) -> Self {
        Self {
            subject_type: subject_type.into(),
            identifier,
        }
    }
}

/// Shared handle to a filterable object
///
/// Handles are request-scoped (`Rc<RefCell<_>>`): the filter, the ledger and
/// the caller all hold clones of the same handle.
#[derive(Clone)]
pub struct ObjectHandle {
    id: ObjectId,
    object: Rc<RefCell<dyn Filterable>>,
}

impl ObjectHandle {
    pub fn new<T: Filterable + 'static>(object: T) -> Self {
        let object: Rc<RefCell<dyn Filterable>> = Rc::new(RefCell::new(object));
        Self {
            id: ObjectId::new(),
            object,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Borrow the object
    ///
    /// # Panics
    ///
    /// Panics if the object is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, dyn Filterable + 'static> {
        self.object.borrow()
    }

    /// Mutably borrow the object
    ///
    /// # Panics
    ///
    /// Panics if the object is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Filterable + 'static> {
        self.object.borrow_mut()
    }

    /// Borrow the object, failing with `InvalidInput` if it is mutably borrowed
    pub fn try_borrow(&self) -> Result<Ref<'_, dyn Filterable + 'static>> {
        self.object.try_borrow().map_err(|_| {
            AuthzError::InvalidInput(format!("Object {} is already mutably borrowed", self.id))
        })
    }

    /// Mutably borrow the object, failing with `InvalidInput` if it is borrowed
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Filterable + 'static>> {
        self.object.try_borrow_mut().map_err(|_| {
            AuthzError::InvalidInput(format!("Object {} is already borrowed", self.id))
        })
    }

    /// Current value of a field (`Value::Null` if absent)
    pub fn field(&self, name: &str) -> Value {
        self.borrow().get_field(name).unwrap_or(Value::Null)
    }

    /// Overwrite a field
    pub fn set_field(&self, name: &str, value: Value) -> Result<()> {
        self.try_borrow_mut()?.set_field(name, value)
    }

    /// Oracle identity of the object
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the object cannot be borrowed or has no subject type.
    pub fn subject(&self) -> Result<SubjectIdentity> {
        let object = self.try_borrow()?;
        let subject_type = object.subject_type();
        if subject_type.trim().is_empty() {
            return Err(AuthzError::InvalidInput(format!(
                "Object {} has no subject type",
                self.id
            )));
        }

        Ok(SubjectIdentity::new(subject_type, object.identifier()))
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ObjectHandle");
        debug.field("id", &self.id);
        match self.object.try_borrow() {
            Ok(object) => debug.field("subject_type", &object.subject_type()),
            Err(_) => debug.field("subject_type", &"<borrowed>"),
        };
        debug.finish()
    }
}

/// Dynamic object: a subject type and an ordered map of field values
///
/// A ready-made [`Filterable`] for hosts that do not implement the trait on
/// their own types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    subject_type: String,
    identifier_field: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create a record whose identifier lives in the `id` field
    pub fn new(subject_type: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            identifier_field: "id".to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Use another field as the identifier
    pub fn with_identifier_field(mut self, field: impl Into<String>) -> Self {
        self.identifier_field = field.into();
        self
    }

    /// Add or replace a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }
}

impl Filterable for Record {
    fn subject_type(&self) -> &str {
        &self.subject_type
    }

    fn identifier(&self) -> Option<Value> {
        self.fields
            .get(&self.identifier_field)
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AuthzError::Field {
                subject: self.subject_type.clone(),
                field: name.to_string(),
                reason: "unknown field".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_fields() {
        let mut record = Record::new("invoice")
            .with_field("id", 42)
            .with_field("amount", 100);

        assert_eq!(record.identifier(), Some(json!(42)));
        assert_eq!(record.field_names(), vec!["amount", "id"]);

        record.set_field("amount", json!(200)).unwrap();
        assert_eq!(record.get("amount"), Some(&json!(200)));
        assert!(record.set_field("missing", json!(1)).is_err());
    }

    #[test]
    fn test_custom_identifier_field() {
        let record = Record::new("account")
            .with_identifier_field("objectIdentifier")
            .with_field("objectIdentifier", "acc-1");
        assert_eq!(record.identifier(), Some(json!("acc-1")));
    }

    #[test]
    fn test_handle_clones_share_identity_and_state() {
        let handle = ObjectHandle::new(Record::new("note").with_field("body", "hi"));
        let clone = handle.clone();

        clone.set_field("body", json!("bye")).unwrap();
        assert_eq!(handle.id(), clone.id());
        assert_eq!(handle.field("body"), json!("bye"));
        assert_ne!(handle.id(), ObjectHandle::new(Record::new("note")).id());
    }

    #[test]
    fn test_borrow_guards_read_and_write_through() {
        let handle = ObjectHandle::new(Record::new("note").with_field("body", "hi"));

        handle.borrow_mut().set_field("body", json!("edited")).unwrap();
        handle.try_borrow_mut().unwrap().set_field("body", json!("again")).unwrap();

        assert_eq!(handle.try_borrow().unwrap().get_field("body"), Some(json!("again")));
        assert_eq!(handle.borrow().subject_type(), "note");
    }

    #[test]
    fn test_subject_requires_accessible_object() {
        let handle = ObjectHandle::new(Record::new("note").with_field("id", 1));
        assert_eq!(
            handle.subject().unwrap(),
            SubjectIdentity::new("note", Some(json!(1)))
        );

        let _guard = handle.borrow_mut();
        assert!(matches!(handle.subject(), Err(AuthzError::InvalidInput(_))));
    }

    #[test]
    fn test_subject_rejects_blank_type() {
        let handle = ObjectHandle::new(Record::new(""));
        assert!(matches!(handle.subject(), Err(AuthzError::InvalidInput(_))));
    }
}

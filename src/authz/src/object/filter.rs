//! Object-level authorization filter
//!
//! Redacts fields the principal cannot view and restores fields changed
//! without edit permission. Work is queued and applied on [`commit`]; outside
//! a transaction every `filter`/`restore` commits immediately.
//!
//! # Pipeline
//!
//! ```text
//! filter()/restore() → ChangeLedger.attach → queue
//!                                             ↓ commit()
//! pre-commit → oracle.preload → Filter | Restore per entry → post-commit
//! ```
//!
//! [`commit`]: ObjectFilter::commit

use super::events::{
    CommitEvent, FieldViewGrantedEvent, ObjectViewGrantedEvent, RestoreViewGrantedEvent,
};
use super::ledger::{ChangeLedger, FieldChange};
use super::oracle::{AuthorizationOracle, Permission, Vote};
use super::redaction::RedactionRuleSet;
use super::types::{ObjectHandle, ObjectId, SubjectIdentity};
use crate::config::FilterConfig;
use crate::error::Result;
use crate::events::EventBus;
use serde_json::Value;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info};

/// Transactional view/edit enforcement over object graphs
///
/// One filter (and its ledger) per request; not shareable across threads.
pub struct ObjectFilter {
    ledger: ChangeLedger,
    oracle: Arc<dyn AuthorizationOracle>,
    redaction: RedactionRuleSet,
    identifier_fields: Vec<String>,
    /// Queued objects, one entry per identity; the action is decided at
    /// commit by `to_filter`
    queue: Vec<ObjectHandle>,
    to_filter: HashSet<ObjectId>,
    transactional: bool,
    pre_commit: EventBus<CommitEvent>,
    post_commit: EventBus<CommitEvent>,
    object_view: EventBus<ObjectViewGrantedEvent>,
    field_view: EventBus<FieldViewGrantedEvent>,
    restore_view: EventBus<RestoreViewGrantedEvent>,
}

impl ObjectFilter {
    /// Create a filter over an authorization oracle
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid.
    pub fn new(config: &FilterConfig, oracle: Arc<dyn AuthorizationOracle>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            ledger: ChangeLedger::new(),
            oracle,
            redaction: RedactionRuleSet::new(),
            identifier_fields: config.identifier_fields.clone(),
            queue: Vec::new(),
            to_filter: HashSet::new(),
            transactional: false,
            pre_commit: EventBus::new(),
            post_commit: EventBus::new(),
            object_view: EventBus::new(),
            field_view: EventBus::new(),
            restore_view: EventBus::new(),
        })
    }

    /// Replace the redaction rules
    pub fn with_redaction_rules(mut self, rules: RedactionRuleSet) -> Self {
        self.redaction = rules;
        self
    }

    pub fn on_pre_commit<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut CommitEvent) -> ControlFlow<()> + 'static,
    {
        self.pre_commit.subscribe(priority, listener);
    }

    pub fn on_post_commit<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut CommitEvent) -> ControlFlow<()> + 'static,
    {
        self.post_commit.subscribe(priority, listener);
    }

    pub fn on_object_view_granted<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut ObjectViewGrantedEvent) -> ControlFlow<()> + 'static,
    {
        self.object_view.subscribe(priority, listener);
    }

    pub fn on_field_view_granted<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut FieldViewGrantedEvent) -> ControlFlow<()> + 'static,
    {
        self.field_view.subscribe(priority, listener);
    }

    pub fn on_restore_view_granted<F>(&mut self, priority: i32, listener: F)
    where
        F: Fn(&mut RestoreViewGrantedEvent) -> ControlFlow<()> + 'static,
    {
        self.restore_view.subscribe(priority, listener);
    }

    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ChangeLedger {
        &mut self.ledger
    }

    /// Whether `filter`/`restore` currently enqueue instead of committing
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Number of queued objects
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue work until the next [`commit`](Self::commit)
    pub fn begin_transaction(&mut self) {
        self.transactional = true;
    }

    /// Redact the fields of `object` the principal cannot view
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the object cannot be inspected; nothing is attached
    /// or queued. Outside a transaction, commit errors are returned as well.
    pub fn filter(&mut self, object: &ObjectHandle) -> Result<()> {
        self.enqueue(object)?;
        self.to_filter.insert(object.id());
        self.auto_commit()
    }

    /// Restore changed fields the principal cannot edit
    ///
    /// # Errors
    ///
    /// Same as [`filter`](Self::filter).
    pub fn restore(&mut self, object: &ObjectHandle) -> Result<()> {
        self.enqueue(object)?;
        self.auto_commit()
    }

    fn enqueue(&mut self, object: &ObjectHandle) -> Result<()> {
        object.subject()?;
        self.ledger.attach(object)?;

        if !self.queue.iter().any(|queued| queued.id() == object.id()) {
            self.queue.push(object.clone());
        }
        Ok(())
    }

    fn auto_commit(&mut self) -> Result<()> {
        if self.transactional {
            Ok(())
        } else {
            self.commit()
        }
    }

    /// Apply every queued action and leave the transaction
    ///
    /// The queue and transaction state are reset even when processing fails.
    pub fn commit(&mut self) -> Result<()> {
        let objects = std::mem::take(&mut self.queue);
        let result = if objects.is_empty() {
            Ok(())
        } else {
            self.process(objects)
        };

        self.to_filter.clear();
        self.transactional = false;
        result
    }

    fn process(&mut self, objects: Vec<ObjectHandle>) -> Result<()> {
        info!("Committing {} object(s)", objects.len());

        self.pre_commit.dispatch(&mut CommitEvent {
            objects: objects.clone(),
        });

        let subjects = objects
            .iter()
            .map(ObjectHandle::subject)
            .collect::<Result<Vec<_>>>()?;
        self.oracle.preload(&subjects)?;

        for handle in &objects {
            if self.to_filter.contains(&handle.id()) {
                self.do_filter(handle)?;
            } else {
                debug!("Restoring object {}", handle.id());
                self.do_restore(handle)?;
            }
        }

        self.post_commit.dispatch(&mut CommitEvent { objects });
        Ok(())
    }

    fn do_filter(&mut self, handle: &ObjectHandle) -> Result<()> {
        self.to_filter.remove(&handle.id());

        let subject = handle.subject()?;
        let clear_all = !self.is_object_view_granted(&subject)?;

        let redactions = {
            let object = handle.try_borrow()?;
            let mut redactions = Vec::new();

            for name in object.field_names() {
                let value = match object.get_field(&name) {
                    Some(value) if !value.is_null() => value,
                    _ => continue,
                };

                if self.is_own_identifier(&name, &value, &subject) {
                    continue;
                }

                if clear_all || !self.is_field_view_granted(&subject, &name)? {
                    let redacted = self.redaction.redact(&value);
                    if redacted != value {
                        redactions.push((name, redacted));
                    }
                }
            }
            redactions
        };

        if redactions.is_empty() {
            return Ok(());
        }

        let mut object = handle.try_borrow_mut()?;
        for (name, redacted) in redactions {
            debug!("Redacting {}.{}", subject.subject_type, name);
            object.set_field(&name, redacted)?;
        }
        Ok(())
    }

    fn do_restore(&mut self, handle: &ObjectHandle) -> Result<()> {
        let subject = handle.subject()?;
        let changes = self.ledger.change_set(handle)?;

        let mut restorations = Vec::new();
        for (name, change) in changes {
            if self.is_restore_required(&subject, &name, &change)? {
                restorations.push((name, change.old));
            }
        }

        if restorations.is_empty() {
            return Ok(());
        }

        let mut object = handle.try_borrow_mut()?;
        for (name, old) in restorations {
            debug!("Restoring {}.{}", subject.subject_type, name);
            object.set_field(&name, old)?;
        }
        Ok(())
    }

    /// `id`-like field holding the object's own identifier
    fn is_own_identifier(&self, name: &str, value: &Value, subject: &SubjectIdentity) -> bool {
        self.identifier_fields.iter().any(|f| f == name)
            && subject.identifier.as_ref() == Some(value)
    }

    fn is_object_view_granted(&self, subject: &SubjectIdentity) -> Result<bool> {
        let mut event = ObjectViewGrantedEvent::new(subject.clone());
        self.object_view.dispatch(&mut event);

        match event.verdict() {
            Some(granted) => Ok(granted),
            None => self
                .oracle
                .is_granted(Permission::View, &Vote::Object(subject.clone())),
        }
    }

    fn is_field_view_granted(&self, subject: &SubjectIdentity, field: &str) -> Result<bool> {
        let mut event = FieldViewGrantedEvent::new(subject.clone(), field);
        self.field_view.dispatch(&mut event);

        match event.verdict() {
            Some(granted) => Ok(granted),
            None => self
                .oracle
                .is_granted(Permission::View, &Vote::field(subject.clone(), field)),
        }
    }

    /// Restoration is required unless the principal may both view and edit the field
    fn is_restore_required(
        &self,
        subject: &SubjectIdentity,
        field: &str,
        change: &FieldChange,
    ) -> Result<bool> {
        let mut event = RestoreViewGrantedEvent::new(
            subject.clone(),
            field,
            change.old.clone(),
            change.new.clone(),
        );
        self.restore_view.dispatch(&mut event);

        if let Some(granted) = event.verdict() {
            return Ok(!granted);
        }

        let vote = Vote::field(subject.clone(), field);
        Ok(!self.oracle.is_granted(Permission::View, &vote)?
            || !self.oracle.is_granted(Permission::Edit, &vote)?)
    }
}

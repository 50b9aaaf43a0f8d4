use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::document::{ComponentBlobs, ComponentId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ComponentError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// The contract a gameplay system implements to take part in saves.
///
/// Both calls run synchronously inside a save or load and must stay cheap.
pub trait Saveable {
    fn serialize_state(&self) -> Result<Vec<u8>, ComponentError>;
    fn deserialize_state(&mut self, bytes: &[u8]) -> Result<(), ComponentError>;
}

impl<T: Saveable + ?Sized> Saveable for Rc<RefCell<T>> {
    fn serialize_state(&self) -> Result<Vec<u8>, ComponentError> {
        let inner = self
            .try_borrow()
            .map_err(|_| ComponentError::new("component is mutably borrowed during save"))?;
        inner.serialize_state()
    }

    fn deserialize_state(&mut self, bytes: &[u8]) -> Result<(), ComponentError> {
        let mut inner = self
            .try_borrow_mut()
            .map_err(|_| ComponentError::new("component is borrowed during load"))?;
        inner.deserialize_state(bytes)
    }
}

/// Adapts a pair of closures to [`Saveable`].
pub struct SaveHooks<S, D> {
    serialize: S,
    deserialize: D,
}

impl<S, D> SaveHooks<S, D>
where
    S: Fn() -> Result<Vec<u8>, ComponentError>,
    D: FnMut(&[u8]) -> Result<(), ComponentError>,
{
    pub fn new(serialize: S, deserialize: D) -> Self {
        Self {
            serialize,
            deserialize,
        }
    }
}

impl<S, D> Saveable for SaveHooks<S, D>
where
    S: Fn() -> Result<Vec<u8>, ComponentError>,
    D: FnMut(&[u8]) -> Result<(), ComponentError>,
{
    fn serialize_state(&self) -> Result<Vec<u8>, ComponentError> {
        (self.serialize)()
    }

    fn deserialize_state(&mut self, bytes: &[u8]) -> Result<(), ComponentError> {
        (self.deserialize)(bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStage {
    Serialize,
    Deserialize,
}

/// One component that was skipped during a save or load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFailure {
    pub id: ComponentId,
    pub stage: ComponentStage,
    pub message: String,
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed to {:?}: {}", self.id, self.stage, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherOutcome {
    pub blobs: ComponentBlobs,
    /// Components whose `serialize_state` ran successfully in this gather.
    pub serialized: BTreeSet<ComponentId>,
    pub failures: Vec<ComponentFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributeOutcome {
    pub loaded: Vec<ComponentId>,
    pub orphaned: Vec<ComponentId>,
    pub failures: Vec<ComponentFailure>,
}

struct RegistrationEntry {
    id: ComponentId,
    component: Box<dyn Saveable>,
}

/// Registered components in registration order, plus the dirty set and any
/// loaded blobs that no registered component claimed.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<RegistrationEntry>,
    dirty: BTreeSet<ComponentId>,
    orphaned: ComponentBlobs,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and keeps the existing hooks when `id` is already registered.
    ///
    /// If the last load carried a blob for `id` that nobody claimed, it is handed
    /// to the new component right away.
    pub fn register<C>(&mut self, id: impl Into<ComponentId>, component: C) -> bool
    where
        C: Saveable + 'static,
    {
        let id = id.into();
        if self.is_registered(id.as_str()) {
            warn!(component_id = %id, "saveable_already_registered");
            return false;
        }

        let mut component: Box<dyn Saveable> = Box::new(component);
        if let Some(blob) = self.orphaned.get(id.as_str()) {
            match component.deserialize_state(blob) {
                Ok(()) => {
                    self.orphaned.remove(id.as_str());
                    info!(component_id = %id, "saveable_claimed_orphaned_blob");
                }
                Err(error) => {
                    error!(
                        component_id = %id,
                        error = %error,
                        "component_deserialize_failed"
                    );
                }
            }
        }

        debug!(component_id = %id, "saveable_registered");
        self.entries.push(RegistrationEntry { id, component });
        true
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        self.dirty.remove(id);
        let Some(index) = self.position(id) else {
            return false;
        };
        self.entries.remove(index);
        debug!(component_id = id, "saveable_unregistered");
        true
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.entries.iter().map(|entry| &entry.id)
    }

    /// Returns `false` for ids that are not registered; those are never tracked.
    pub fn mark_dirty(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            warn!(component_id = id, "mark_dirty_unknown_component");
            return false;
        };
        let id = self.entries[index].id.clone();
        self.dirty.insert(id);
        true
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.dirty.contains(id)
    }

    pub fn dirty_ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.dirty.iter()
    }

    pub(crate) fn clear_dirty(&mut self, written: &BTreeSet<ComponentId>) {
        self.dirty.retain(|id| !written.contains(id));
    }

    pub fn orphaned(&self) -> &ComponentBlobs {
        &self.orphaned
    }

    /// Serializes every registered component. Failing components are left out.
    pub fn gather_all(&self) -> GatherOutcome {
        let mut outcome = GatherOutcome::default();
        for entry in &self.entries {
            self.serialize_into(entry, &mut outcome);
        }
        self.carry_orphans(&mut outcome);
        outcome
    }

    /// Starts from `previous` and re-serializes only dirty components, plus any
    /// registered component that `previous` has no blob for.
    ///
    /// A dirty component that fails keeps its previous blob.
    pub fn gather_dirty(&self, previous: &ComponentBlobs) -> GatherOutcome {
        let mut outcome = GatherOutcome {
            blobs: previous.clone(),
            ..GatherOutcome::default()
        };
        for entry in &self.entries {
            let needs_write =
                self.dirty.contains(&entry.id) || !previous.contains_key(&entry.id);
            if needs_write {
                self.serialize_into(entry, &mut outcome);
            }
        }
        self.carry_orphans(&mut outcome);
        outcome
    }

    /// Hands each blob to the registered component with the same id. Blobs with
    /// no matching component are kept and written back on the next save.
    pub fn distribute(&mut self, blobs: &ComponentBlobs) -> DistributeOutcome {
        let mut outcome = DistributeOutcome::default();
        self.orphaned.clear();

        for (id, blob) in blobs {
            let Some(index) = self.position(id.as_str()) else {
                outcome.orphaned.push(id.clone());
                self.orphaned.insert(id.clone(), blob.clone());
                continue;
            };
            match self.entries[index].component.deserialize_state(blob) {
                Ok(()) => outcome.loaded.push(id.clone()),
                Err(error) => {
                    error!(
                        component_id = %id,
                        error = %error,
                        "component_deserialize_failed"
                    );
                    outcome.failures.push(ComponentFailure {
                        id: id.clone(),
                        stage: ComponentStage::Deserialize,
                        message: error.to_string(),
                    });
                }
            }
        }

        if !outcome.orphaned.is_empty() {
            info!(
                orphaned_count = outcome.orphaned.len(),
                "unclaimed_component_blobs_retained"
            );
        }
        self.dirty.clear();
        outcome
    }

    fn serialize_into(&self, entry: &RegistrationEntry, outcome: &mut GatherOutcome) {
        match entry.component.serialize_state() {
            Ok(blob) => {
                outcome.blobs.insert(entry.id.clone(), blob);
                outcome.serialized.insert(entry.id.clone());
            }
            Err(error) => {
                error!(
                    component_id = %entry.id,
                    error = %error,
                    "component_serialize_failed"
                );
                outcome.failures.push(ComponentFailure {
                    id: entry.id.clone(),
                    stage: ComponentStage::Serialize,
                    message: error.to_string(),
                });
            }
        }
    }

    fn carry_orphans(&self, outcome: &mut GatherOutcome) {
        for (id, blob) in &self.orphaned {
            if !self.is_registered(id.as_str()) {
                outcome
                    .blobs
                    .entry(id.clone())
                    .or_insert_with(|| blob.clone());
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id.as_str() == id)
    }
}

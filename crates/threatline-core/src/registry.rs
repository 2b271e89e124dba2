//! Entity registry
//!
//! Resolves entity names to a single canonical record per namespace. Resolution is
//! "first write wins": once a name is registered its record is never overwritten by a later
//! declaration or reference.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{Component, Control, Namespace, Threat, PATH_DELIMITER};

/// Identity key for an entity name. Names are their own identity.
pub fn entity_key(name: &str) -> String {
    name.to_string()
}

/// Parent path segments of a hierarchical component name
///
/// `"Web:Frontend"` yields `["Web"]`; a name without a delimiter yields no segments.
pub fn parent_segments(name: &str) -> Vec<String> {
    let mut segments: Vec<String> = name.split(PATH_DELIMITER).map(str::to_string).collect();
    segments.pop();
    segments
}

/// Behaviour shared by components, controls and threats
pub trait Entity: Clone {
    /// Namespace this entity lives in
    const NAMESPACE: Namespace;

    /// Build a fresh record for `name`
    fn create(id: String, name: &str, run_id: &str) -> Self;

    /// Identity key
    fn id(&self) -> &str;

    /// Display name
    fn name(&self) -> &str;

    /// Free-text description
    fn description(&self) -> &str;

    /// Replace the description (only used on freshly created records)
    fn set_description(&mut self, description: String);
}

impl Entity for Component {
    const NAMESPACE: Namespace = Namespace::Component;

    fn create(id: String, name: &str, run_id: &str) -> Self {
        let segments = parent_segments(name);
        let paths = if segments.is_empty() {
            Vec::new()
        } else {
            vec![segments]
        };
        Component {
            id,
            run_id: run_id.to_string(),
            name: name.to_string(),
            paths,
            ..Default::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn set_description(&mut self, description: String) {
        self.description = description;
    }
}

macro_rules! flat_entity {
    ($ty:ty, $ns:expr) => {
        impl Entity for $ty {
            const NAMESPACE: Namespace = $ns;

            fn create(id: String, name: &str, run_id: &str) -> Self {
                Self {
                    id,
                    run_id: run_id.to_string(),
                    name: name.to_string(),
                    ..Default::default()
                }
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn description(&self) -> &str {
                &self.description
            }

            fn set_description(&mut self, description: String) {
                self.description = description;
            }
        }
    };
}

flat_entity!(Control, Namespace::Control);
flat_entity!(Threat, Namespace::Threat);

/// A resolved entity of any namespace
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    Component(&'a Component),
    Control(&'a Control),
    Threat(&'a Threat),
}

impl EntityRef<'_> {
    /// Identity key of the referenced entity
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Component(c) => &c.id,
            EntityRef::Control(c) => &c.id,
            EntityRef::Threat(t) => &t.id,
        }
    }

    /// Description of the referenced entity
    pub fn description(&self) -> &str {
        match self {
            EntityRef::Component(c) => &c.description,
            EntityRef::Control(c) => &c.description,
            EntityRef::Threat(t) => &t.description,
        }
    }
}

/// Namespace → name → entity mapping with get-or-create resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRegistry {
    components: BTreeMap<String, Component>,
    controls: BTreeMap<String, Control>,
    threats: BTreeMap<String, Threat>,
    run_id: String,
}

impl EntityRegistry {
    /// Create an empty registry stamping new entities with `run_id`
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// Build a registry from persisted entity maps
    pub fn from_parts(
        components: BTreeMap<String, Component>,
        controls: BTreeMap<String, Control>,
        threats: BTreeMap<String, Threat>,
    ) -> Self {
        Self {
            components,
            controls,
            threats,
            run_id: String::new(),
        }
    }

    /// Run identifier stamped on newly created entities
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub(crate) fn set_run_id(&mut self, run_id: impl Into<String>) {
        self.run_id = run_id.into();
    }

    /// Resolve `name` in `namespace`, creating the entity on first reference
    pub fn get_or_create(&mut self, namespace: Namespace, name: &str) -> EntityRef<'_> {
        self.declare(namespace, name, None)
    }

    /// Resolve `name`, giving a newly created entity `description`
    ///
    /// An existing entity is returned unchanged; its description is never replaced.
    pub fn declare(
        &mut self,
        namespace: Namespace,
        name: &str,
        description: Option<&str>,
    ) -> EntityRef<'_> {
        let run_id = self.run_id.as_str();
        match namespace {
            Namespace::Component => {
                EntityRef::Component(resolve(&mut self.components, name, description, run_id))
            }
            Namespace::Control => {
                EntityRef::Control(resolve(&mut self.controls, name, description, run_id))
            }
            Namespace::Threat => {
                EntityRef::Threat(resolve(&mut self.threats, name, description, run_id))
            }
        }
    }

    /// Merge entities from `other`; entities already present here win
    pub fn absorb(&mut self, other: EntityRegistry) {
        merge_missing(&mut self.components, other.components);
        merge_missing(&mut self.controls, other.controls);
        merge_missing(&mut self.threats, other.threats);
    }

    /// Whether `name` is registered in `namespace`
    pub fn contains(&self, namespace: Namespace, name: &str) -> bool {
        let key = entity_key(name);
        match namespace {
            Namespace::Component => self.components.contains_key(&key),
            Namespace::Control => self.controls.contains_key(&key),
            Namespace::Threat => self.threats.contains_key(&key),
        }
    }

    /// Look up a component by name
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(&entity_key(name))
    }

    /// Look up a control by name
    pub fn control(&self, name: &str) -> Option<&Control> {
        self.controls.get(&entity_key(name))
    }

    /// Look up a threat by name
    pub fn threat(&self, name: &str) -> Option<&Threat> {
        self.threats.get(&entity_key(name))
    }

    /// All components keyed by name
    pub fn components(&self) -> &BTreeMap<String, Component> {
        &self.components
    }

    /// All controls keyed by name
    pub fn controls(&self) -> &BTreeMap<String, Control> {
        &self.controls
    }

    /// All threats keyed by name
    pub fn threats(&self) -> &BTreeMap<String, Threat> {
        &self.threats
    }

    /// Total number of entities across namespaces
    pub fn len(&self) -> usize {
        self.components.len() + self.controls.len() + self.threats.len()
    }

    /// Whether no entity is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve<'a, E: Entity>(
    map: &'a mut BTreeMap<String, E>,
    name: &str,
    description: Option<&str>,
    run_id: &str,
) -> &'a E {
    match map.entry(entity_key(name)) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            debug!(namespace = %E::NAMESPACE, name, "Registering entity");
            let mut entity = E::create(entry.key().clone(), name, run_id);
            if let Some(description) = description {
                entity.set_description(description.to_string());
            }
            entry.insert(entity)
        }
    }
}

fn merge_missing<E: Entity>(into: &mut BTreeMap<String, E>, from: BTreeMap<String, E>) {
    for (key, entity) in from {
        into.entry(key).or_insert(entity);
    }
}

//! Per-path context bookkeeping.

use std::collections::BTreeSet;

use crate::annotation::{AnnotationInstance, AnnotationKey, ComponentReference, Composition};
use crate::key::TypeRef;
use crate::types::TypeInfo;

use super::{AnnotationMap, ComponentContext, Values};

/// Context annotations along one dependency path.
///
/// `defined` accumulates annotations going down the path, `active` collects
/// the ones some component at or below this point actually accepts. The
/// active set, not the defined one, keys the component cache.
///
/// The container drives it per dependency edge: the edge definition is a
/// [`copy`](Self::copy) of the consumer's, [`expand`](Self::expand)ed with
/// the edge annotations; the dependency narrows it with
/// [`accept`](Self::accept), and the consumer gathers what its
/// dependencies used with [`collect`](Self::collect).
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{AnnotationInstance, ContextAnnotation, ContextDefinition};
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Color(&'static str);
/// impl ContextAnnotation for Color {
///     const NAME: &'static str = "color";
/// }
///
/// let mut definition = ContextDefinition::new();
/// definition.expand(&[AnnotationInstance::new(Color("red"))], None);
///
/// let ignoring = definition.accept_keys(&[]);
/// assert!(ignoring.create().is_empty());
///
/// let accepting = definition.accept_keys(&[fluid_tools::AnnotationKey::of::<Color>()]);
/// assert_eq!(accepting.create().annotation::<Color>(), Some(Color("red")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextDefinition {
    defined: AnnotationMap,
    active: AnnotationMap,
    // types replaced by the latest expansion: the consumer's values for them
    // never reach the dependency
    shadowed: BTreeSet<AnnotationKey>,
}

impl ContextDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the annotations of a dependency edge.
    ///
    /// Immediate annotations of the previous edge are dropped first. When
    /// `reference` is given it is recorded as a [`ComponentReference`].
    pub fn expand(&mut self, annotations: &[AnnotationInstance], reference: Option<TypeRef>) {
        self.defined
            .retain(|key, _| key.composition() != Composition::Immediate);
        self.active
            .retain(|key, _| key.composition() != Composition::Immediate);
        self.shadowed.clear();

        if let Some(reference) = reference {
            self.define(&[AnnotationInstance::new(ComponentReference(reference))]);
        }
        self.define(annotations);
        self.check();
    }

    pub(crate) fn define(&mut self, annotations: &[AnnotationInstance]) {
        for annotation in annotations {
            let key = annotation.key();
            match key.composition() {
                Composition::All => {
                    let values = self.defined.entry(key).or_default();
                    if !values.contains(annotation) {
                        values.push(annotation.clone());
                    }
                }
                Composition::Last | Composition::Immediate => {
                    let mut values = Values::new();
                    values.push(annotation.clone());
                    self.defined.insert(key, values);
                    self.active.remove(&key);
                    self.shadowed.insert(key);
                }
            }
        }
    }

    /// A copy narrowed to what `consumer` accepts.
    pub fn accept(&self, consumer: &TypeInfo) -> ContextDefinition {
        self.accept_keys(consumer.accepted())
    }

    /// A copy whose active set holds exactly the defined annotations of the
    /// given types.
    pub fn accept_keys(&self, accepted: &[AnnotationKey]) -> ContextDefinition {
        let active = self
            .defined
            .iter()
            .filter(|(key, _)| accepted.contains(key))
            .map(|(key, values)| (*key, values.clone()))
            .collect();
        ContextDefinition {
            defined: self.defined.clone(),
            active,
            shadowed: BTreeSet::new(),
        }
    }

    /// Marks as active the annotations of `context` that this definition
    /// defines.
    pub fn consume(&mut self, context: &ComponentContext) {
        for key in context.keys() {
            if let Some(values) = self.defined.get(&key) {
                self.active.insert(key, values.clone());
            }
        }
        self.check();
    }

    /// Merges the active sets of dependency edge definitions.
    ///
    /// Annotation types an edge replaced are skipped since the values defined
    /// here never reached the dependency.
    pub fn collect<'a>(&mut self, edges: impl IntoIterator<Item = &'a ContextDefinition>) {
        for edge in edges {
            for key in edge.active.keys() {
                if edge.shadowed.contains(key) {
                    continue;
                }
                if let Some(values) = self.defined.get(key) {
                    self.active.insert(*key, values.clone());
                }
            }
        }
        self.check();
    }

    /// Independent copy.
    pub fn copy(&self) -> ContextDefinition {
        self.clone()
    }

    /// Snapshot of the active set.
    pub fn create(&self) -> ComponentContext {
        ComponentContext::from_map(self.active.clone())
    }

    /// Snapshot of the defined set.
    pub fn create_defined(&self) -> ComponentContext {
        ComponentContext::from_map(self.defined.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }

    pub fn defines(&self, key: &AnnotationKey) -> bool {
        self.defined.contains_key(key)
    }

    pub fn is_active(&self, key: &AnnotationKey) -> bool {
        self.active.contains_key(key)
    }

    #[inline]
    fn check(&self) {
        debug_assert!(
            self.active.iter().all(|(key, values)| {
                self.defined
                    .get(key)
                    .map_or(false, |defined| values.iter().all(|value| defined.contains(value)))
            }),
            "active context annotations must be defined"
        );
    }
}

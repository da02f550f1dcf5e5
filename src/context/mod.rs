//! Component contexts.
//!
//! A [`ComponentContext`] is the immutable set of context annotations that
//! applies to one instantiation of a component. It doubles as the component
//! cache key: two resolutions share an instance exactly when their contexts
//! are equal.

mod definition;

pub use definition::ContextDefinition;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::annotation::{AnnotationInstance, AnnotationKey, ContextAnnotation};
use crate::key::Reflect;
use crate::types::TypeInfo;

pub(crate) type Values = SmallVec<[AnnotationInstance; 1]>;
pub(crate) type AnnotationMap = BTreeMap<AnnotationKey, Values>;

/// Immutable snapshot of context annotations.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{AnnotationInstance, ComponentContext, ContextAnnotation};
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Region(&'static str);
///
/// impl ContextAnnotation for Region {
///     const NAME: &'static str = "region";
///     fn value(&self) -> String { self.0.to_string() }
/// }
///
/// let context = ComponentContext::of([AnnotationInstance::new(Region("eu"))]);
/// assert_eq!(context.annotation::<Region>(), Some(Region("eu")));
/// assert_eq!(context.value("region", "us"), "eu");
/// assert_eq!(context.value("zone", "a"), "a");
/// assert!(context.defines("region"));
/// assert_eq!(context, ComponentContext::of([AnnotationInstance::new(Region("eu"))]));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentContext {
    entries: Arc<AnnotationMap>,
}

impl ComponentContext {
    /// The context without annotations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context made of the given annotations, combined per their composition.
    pub fn of(annotations: impl IntoIterator<Item = AnnotationInstance>) -> Self {
        let mut definition = ContextDefinition::new();
        let annotations: Vec<_> = annotations.into_iter().collect();
        definition.define(&annotations);
        definition.create_defined()
    }

    pub(crate) fn from_map(entries: AnnotationMap) -> Self {
        ComponentContext {
            entries: Arc::new(entries),
        }
    }

    pub(crate) fn entries(&self) -> &AnnotationMap {
        &self.entries
    }

    /// The last annotation of type `A`.
    pub fn annotation<A: ContextAnnotation>(&self) -> Option<A> {
        self.entries
            .get(&AnnotationKey::of::<A>())
            .and_then(|values| values.last())
            .and_then(|value| value.downcast_ref::<A>())
            .cloned()
    }

    /// Every annotation of type `A`, in definition order.
    pub fn annotations<A: ContextAnnotation>(&self) -> Vec<A> {
        self.entries
            .get(&AnnotationKey::of::<A>())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| value.downcast_ref::<A>())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Value of the annotation named `key`, or `default` when absent.
    pub fn value(&self, key: &str, default: &str) -> String {
        self.find(key)
            .and_then(|values| values.last())
            .map(AnnotationInstance::value)
            .unwrap_or_else(|| default.to_string())
    }

    /// Whether an annotation named `key` is present.
    pub fn defines(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    fn find(&self, key: &str) -> Option<&Values> {
        self.entries
            .iter()
            .find(|(annotation, _)| annotation.name() == key)
            .map(|(_, values)| values)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Annotation types present in this context.
    pub fn keys(&self) -> impl Iterator<Item = AnnotationKey> + '_ {
        self.entries.keys().copied()
    }

    /// The subset of this context with the given annotation types.
    pub fn narrow(&self, keys: &[AnnotationKey]) -> ComponentContext {
        if self.entries.keys().all(|key| keys.contains(key)) {
            return self.clone();
        }
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| keys.contains(key))
            .map(|(key, values)| (*key, values.clone()))
            .collect();
        ComponentContext::from_map(entries)
    }

    /// Both contexts together; `other` wins on conflicting types.
    pub fn union(&self, other: &ComponentContext) -> ComponentContext {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut entries = (*self.entries).clone();
        for (key, values) in other.entries.iter() {
            entries.insert(*key, values.clone());
        }
        ComponentContext::from_map(entries)
    }
}

impl Reflect for ComponentContext {
    fn type_info() -> TypeInfo {
        TypeInfo::final_class::<Self>().into()
    }
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.values().flat_map(|values| values.iter()))
            .finish()
    }
}

impl fmt::Display for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        let mut first = true;
        for value in self.entries.values().flat_map(|values| values.iter()) {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "@{}={}", value.key().name(), value.value())?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Composition;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Tag(&'static str);

    impl ContextAnnotation for Tag {
        const NAME: &'static str = "tag";
        const COMPOSITION: Composition = Composition::All;

        fn value(&self) -> String {
            self.0.to_string()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Mode(u8);

    impl ContextAnnotation for Mode {
        const NAME: &'static str = "mode";
    }

    #[test]
    fn repeated_annotations_are_kept_in_order() {
        let context = ComponentContext::of([
            AnnotationInstance::new(Tag("a")),
            AnnotationInstance::new(Tag("b")),
            AnnotationInstance::new(Tag("a")),
        ]);
        assert_eq!(context.annotations::<Tag>(), vec![Tag("a"), Tag("b")]);
        assert_eq!(context.annotation::<Tag>(), Some(Tag("b")));
        assert_eq!(context.value("tag", "-"), "b");
    }

    #[test]
    fn last_definition_wins() {
        let context = ComponentContext::of([
            AnnotationInstance::new(Mode(1)),
            AnnotationInstance::new(Mode(2)),
        ]);
        assert_eq!(context.annotation::<Mode>(), Some(Mode(2)));
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn narrow_and_union() {
        let context = ComponentContext::of([
            AnnotationInstance::new(Mode(1)),
            AnnotationInstance::new(Tag("x")),
        ]);
        let narrowed = context.narrow(&[AnnotationKey::of::<Mode>()]);
        assert_eq!(narrowed.len(), 1);
        assert!(narrowed.annotation::<Tag>().is_none());

        let other = ComponentContext::of([AnnotationInstance::new(Tag("y"))]);
        let merged = narrowed.union(&other);
        assert_eq!(merged.annotation::<Tag>(), Some(Tag("y")));
        assert_eq!(merged.annotation::<Mode>(), Some(Mode(1)));
    }

    #[test]
    fn display_lists_values() {
        let context = ComponentContext::of([AnnotationInstance::new(Tag("x"))]);
        assert_eq!(context.to_string(), "[@tag=x]");
        assert_eq!(ComponentContext::empty().to_string(), "[]");
    }
}

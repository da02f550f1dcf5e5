//! Context annotations.
//!
//! A context annotation is a small value attached to a dependency reference
//! (or to a component class, for all of its dependencies) that configures
//! the components resolved below it. Components declare which annotation
//! types they accept; only accepted annotations reach their
//! [`ComponentContext`](crate::ComponentContext).

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::key::TypeRef;

/// How repeated definitions of the same annotation type combine along a
/// dependency path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Composition {
    /// A later definition replaces the earlier one
    #[default]
    Last,
    /// Definitions accumulate, in path order, without duplicates
    All,
    /// Applies to the immediately following dependency only
    Immediate,
}

/// A context annotation type.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{AnnotationInstance, ContextAnnotation};
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Locale(&'static str);
///
/// impl ContextAnnotation for Locale {
///     const NAME: &'static str = "locale";
///
///     fn value(&self) -> String {
///         self.0.to_string()
///     }
/// }
///
/// let annotation = AnnotationInstance::new(Locale("en"));
/// assert_eq!(annotation.value(), "en");
/// assert_eq!(annotation.downcast_ref::<Locale>(), Some(&Locale("en")));
/// ```
pub trait ContextAnnotation: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Key used by [`ComponentContext::value`](crate::ComponentContext::value).
    const NAME: &'static str;
    /// Composition of repeated definitions.
    const COMPOSITION: Composition = Composition::Last;

    /// Textual value.
    fn value(&self) -> String {
        format!("{:?}", self)
    }
}

/// Identity of a context annotation type.
#[derive(Clone, Copy)]
pub struct AnnotationKey {
    id: TypeId,
    name: &'static str,
    composition: Composition,
}

impl AnnotationKey {
    pub fn of<A: ContextAnnotation>() -> Self {
        AnnotationKey {
            id: TypeId::of::<A>(),
            name: A::NAME,
            composition: A::COMPOSITION,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn composition(&self) -> Composition {
        self.composition
    }
}

impl PartialEq for AnnotationKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AnnotationKey {}

impl Hash for AnnotationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for AnnotationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AnnotationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Debug for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

trait ErasedAnnotation: Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_erased(&self, other: &dyn ErasedAnnotation) -> bool;
    fn hash_erased(&self, state: &mut dyn Hasher);
    fn value(&self) -> String;
}

impl<A: ContextAnnotation> ErasedAnnotation for A {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_erased(&self, other: &dyn ErasedAnnotation) -> bool {
        other
            .as_any()
            .downcast_ref::<A>()
            .map_or(false, |other| self == other)
    }

    fn hash_erased(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn value(&self) -> String {
        ContextAnnotation::value(self)
    }
}

/// A type-erased, hashable annotation value.
#[derive(Clone)]
pub struct AnnotationInstance {
    key: AnnotationKey,
    value: Arc<dyn ErasedAnnotation>,
}

impl AnnotationInstance {
    pub fn new<A: ContextAnnotation>(annotation: A) -> Self {
        AnnotationInstance {
            key: AnnotationKey::of::<A>(),
            value: Arc::new(annotation),
        }
    }

    pub fn key(&self) -> AnnotationKey {
        self.key
    }

    /// The concrete annotation, if it is an `A`.
    pub fn downcast_ref<A: ContextAnnotation>(&self) -> Option<&A> {
        self.value.as_any().downcast_ref::<A>()
    }

    /// Textual value of the annotation.
    pub fn value(&self) -> String {
        self.value.value()
    }
}

impl PartialEq for AnnotationInstance {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value.eq_erased(&*other.value)
    }
}

impl Eq for AnnotationInstance {}

impl Hash for AnnotationInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.value.hash_erased(state);
    }
}

impl fmt::Debug for AnnotationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}({:?})", self.key.name, self.value)
    }
}

impl<A: ContextAnnotation> From<A> for AnnotationInstance {
    fn from(annotation: A) -> Self {
        AnnotationInstance::new(annotation)
    }
}

/// The type of the dependency reference a component is resolved for.
///
/// Recorded by [`ContextDefinition::expand`](crate::ContextDefinition::expand)
/// and visible to components that accept it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentReference(pub TypeRef);

impl ContextAnnotation for ComponentReference {
    const NAME: &'static str = "reference";
    const COMPOSITION: Composition = Composition::Immediate;

    fn value(&self) -> String {
        self.0.name().to_string()
    }
}

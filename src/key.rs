//! Type identity for component interfaces and implementations.

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::TypeInfo;

/// Declarative type metadata.
///
/// Every type that is bound, injected or used as a component interface
/// describes itself through this trait: its kind, the interfaces it
/// implements, its component and group settings and the context annotations
/// it accepts. The interface inspector works on nothing but this data.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{Reflect, TypeInfo, TypeRef};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// impl Reflect for dyn Greeter {
///     fn type_info() -> TypeInfo {
///         TypeInfo::interface::<Self>()
///     }
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// impl Reflect for English {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>()
///             .implements::<dyn Greeter>(|it| it)
///             .into()
///     }
/// }
///
/// let english = TypeRef::of::<English>().info();
/// assert!(english.is_assignable_to(&TypeRef::of::<dyn Greeter>()));
/// ```
pub trait Reflect: 'static {
    /// Describes the implementing type.
    fn type_info() -> TypeInfo;
}

/// Identity of a reflected type.
///
/// Equality and hashing use the `TypeId` only; the name is carried for
/// diagnostics and the descriptor is produced on demand.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    info: fn() -> TypeInfo,
}

impl TypeRef {
    /// Reference to `T`, which may be a `dyn Trait`.
    #[inline]
    pub fn of<T: ?Sized + Reflect>() -> Self {
        TypeRef {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            info: <T as Reflect>::type_info,
        }
    }

    /// The `TypeId` of the referenced type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name, as reported by `std::any::type_name`.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the type's descriptor.
    pub fn info(&self) -> TypeInfo {
        (self.info)()
    }

    /// Whether the referenced type is an interface (a `dyn Trait`).
    pub fn is_interface(&self) -> bool {
        self.info().is_interface()
    }
}

impl PartialEq for TypeRef {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Name first so that orderings are stable and readable across runs
impl Ord for TypeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Helper for creating type references.
#[inline(always)]
pub fn type_ref<T: ?Sized + Reflect>() -> TypeRef {
    TypeRef::of::<T>()
}

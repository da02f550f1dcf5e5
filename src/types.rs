//! Declarative type descriptors.
//!
//! [`TypeInfo`] is the data the interface inspector and the container work
//! on in place of runtime reflection: the kind of a type, its superclass and
//! interfaces, its component and group settings, the context annotations it
//! accepts and defines, and the conversions from an implementation to each
//! interface it can be bound as.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::annotation::{AnnotationInstance, AnnotationKey, ContextAnnotation};
use crate::factory::{ComponentFactory, ComponentVariantFactory};
use crate::graph::{Reference, Slot};
use crate::instance::{AnyArc, Instance};
use crate::key::{Reflect, TypeRef};
use crate::lifetime::Lifetime;

/// Conversion from a raw implementation `Arc<T>` to an interface instance.
pub(crate) type Caster = Arc<dyn Fn(&AnyArc) -> Option<Instance> + Send + Sync>;

/// Stand-in for an interface whose component is still being instantiated.
type Proxy = Arc<dyn Fn(Arc<Slot>) -> Instance + Send + Sync>;

/// The kind of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A `dyn Trait` used as component or group interface
    Interface,
    /// A concrete type that can be extended
    Class,
    /// A type that cannot be instantiated itself
    AbstractClass,
    /// A concrete type that cannot be extended
    FinalClass,
}

/// Component settings of a type, the `@Component` annotation.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{ComponentSpec, Reflect, TypeInfo, TypeRef};
///
/// trait Store: Send + Sync {}
/// impl Reflect for dyn Store {
///     fn type_info() -> TypeInfo { TypeInfo::interface::<Self>() }
/// }
///
/// let spec = ComponentSpec::new().api::<dyn Store>().fallback();
/// assert_eq!(spec.apis(), &[TypeRef::of::<dyn Store>()]);
/// assert!(spec.is_fallback());
/// assert!(spec.is_automatic());
/// ```
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    api: Vec<TypeRef>,
    automatic: bool,
    scope: Option<TypeRef>,
    lifetime: Lifetime,
    fallback: bool,
}

impl ComponentSpec {
    pub fn new() -> Self {
        ComponentSpec {
            api: Vec::new(),
            automatic: true,
            scope: None,
            lifetime: Lifetime::Cached,
            fallback: false,
        }
    }

    /// Adds an explicit component interface.
    pub fn api<I: ?Sized + Reflect>(mut self) -> Self {
        self.api.push(TypeRef::of::<I>());
        self
    }

    /// Excludes the component from automatic discovery.
    pub fn manual(mut self) -> Self {
        self.automatic = false;
        self
    }

    /// Restricts automatic binding to containers of the given scope.
    pub fn scoped<S: ?Sized + Reflect>(mut self) -> Self {
        self.scope = Some(TypeRef::of::<S>());
        self
    }

    pub fn stateful(mut self) -> Self {
        self.lifetime = Lifetime::Stateful;
        self
    }

    /// Makes the binding the lowest precedence candidate for its interfaces.
    pub fn fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    pub fn apis(&self) -> &[TypeRef] {
        &self.api
    }

    pub fn is_automatic(&self) -> bool {
        self.automatic
    }

    pub fn scope(&self) -> Option<TypeRef> {
        self.scope
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl Default for ComponentSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// Group settings of a type, the `@ComponentGroup` annotation.
#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
    api: Vec<TypeRef>,
}

impl GroupSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an explicit group interface.
    pub fn api<G: ?Sized + Reflect>(mut self) -> Self {
        self.api.push(TypeRef::of::<G>());
        self
    }

    pub fn apis(&self) -> &[TypeRef] {
        &self.api
    }
}

/// Descriptor of a reflected type.
#[derive(Clone)]
pub struct TypeInfo {
    this: TypeRef,
    kind: TypeKind,
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    component: Option<ComponentSpec>,
    group: Option<GroupSpec>,
    anonymous: bool,
    primitive: Option<TypeRef>,
    accepts: Vec<AnnotationKey>,
    defines: Vec<AnnotationInstance>,
    casts: Vec<(TypeId, Caster)>,
    proxy: Option<Proxy>,
}

impl TypeInfo {
    fn with_kind(this: TypeRef, kind: TypeKind) -> Self {
        TypeInfo {
            this,
            kind,
            superclass: None,
            interfaces: Vec::new(),
            component: None,
            group: None,
            anonymous: false,
            primitive: None,
            accepts: Vec::new(),
            defines: Vec::new(),
            casts: Vec::new(),
            proxy: None,
        }
    }

    /// Descriptor of an interface type.
    pub fn interface<I: ?Sized + Reflect>() -> Self {
        Self::with_kind(TypeRef::of::<I>(), TypeKind::Interface)
    }

    /// Descriptor builder of an extensible class.
    pub fn class<T: Reflect + Send + Sync>() -> ClassInfo<T> {
        ClassInfo::new(TypeKind::Class)
    }

    /// Descriptor builder of an abstract class.
    pub fn abstract_class<T: Reflect + Send + Sync>() -> ClassInfo<T> {
        ClassInfo::new(TypeKind::AbstractClass)
    }

    /// Descriptor builder of a final class.
    pub fn final_class<T: Reflect + Send + Sync>() -> ClassInfo<T> {
        ClassInfo::new(TypeKind::FinalClass)
    }

    /// Adds a super-interface (for interfaces) or a directly implemented
    /// interface that needs no conversion.
    pub fn extends<I: ?Sized + Reflect>(mut self) -> Self {
        self.interfaces.push(TypeRef::of::<I>());
        self
    }

    pub fn component(mut self, spec: ComponentSpec) -> Self {
        self.component = Some(spec);
        self
    }

    pub fn group(mut self, spec: GroupSpec) -> Self {
        self.group = Some(spec);
        self
    }

    /// Accepts context annotations of type `A`.
    pub fn accepts<A: ContextAnnotation>(mut self) -> Self {
        self.accepts.push(AnnotationKey::of::<A>());
        self
    }

    /// Registers the proxy injected for this interface on a circular
    /// dependency.
    ///
    /// `make` wraps a [`Reference`] that is filled once the component on the
    /// other end of the cycle exists; the proxy forwards calls through it.
    /// Circular dependencies on interfaces without a proxy fail with
    /// [`ResolutionError::Circular`](crate::ResolutionError::Circular).
    ///
    /// ```rust
    /// use fluid_tools::{Reference, Reflect, TypeInfo, TypeRef};
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    ///
    /// struct ClockProxy(Reference<dyn Clock>);
    /// impl Clock for ClockProxy {
    ///     fn now(&self) -> u64 {
    ///         self.0.get().map(|clock| clock.now()).unwrap_or_default()
    ///     }
    /// }
    ///
    /// impl Reflect for dyn Clock {
    ///     fn type_info() -> TypeInfo {
    ///         TypeInfo::interface::<Self>().proxy::<Self>(|it| Arc::new(ClockProxy(it)))
    ///     }
    /// }
    ///
    /// assert!(TypeRef::of::<dyn Clock>().info().has_proxy());
    /// ```
    pub fn proxy<I>(mut self, make: fn(Reference<I>) -> Arc<I>) -> Self
    where
        I: ?Sized + Reflect + Send + Sync + 'static,
    {
        debug_assert_eq!(TypeRef::of::<I>(), self.this, "proxy for a different interface");
        let proxy: Proxy = Arc::new(move |slot: Arc<Slot>| Instance::new(make(Reference::new(slot))));
        self.proxy = Some(proxy);
        self
    }

    pub fn this(&self) -> TypeRef {
        self.this
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::AbstractClass)
    }

    pub fn is_final(&self) -> bool {
        self.kind == TypeKind::FinalClass
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn superclass(&self) -> Option<TypeRef> {
        self.superclass
    }

    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    pub fn component_spec(&self) -> Option<&ComponentSpec> {
        self.component.as_ref()
    }

    pub fn group_spec(&self) -> Option<&GroupSpec> {
        self.group.as_ref()
    }

    pub fn has_proxy(&self) -> bool {
        self.proxy.is_some()
    }

    pub(crate) fn make_proxy(&self, slot: Arc<Slot>) -> Option<Instance> {
        self.proxy.as_ref().map(|make| make(slot))
    }

    pub fn primitive(&self) -> Option<TypeRef> {
        self.primitive
    }

    pub fn accepted(&self) -> &[AnnotationKey] {
        &self.accepts
    }

    pub fn defined(&self) -> &[AnnotationInstance] {
        &self.defines
    }

    pub fn lifetime(&self) -> Lifetime {
        self.component
            .as_ref()
            .map(ComponentSpec::lifetime)
            .unwrap_or_default()
    }

    /// Whether this type is `target` or reaches it through its interfaces or
    /// superclass chain.
    pub fn is_assignable_to(&self, target: &TypeRef) -> bool {
        let mut visited = HashSet::new();
        self.reaches(target, &mut visited)
    }

    fn reaches(&self, target: &TypeRef, visited: &mut HashSet<TypeRef>) -> bool {
        if self.this == *target {
            return true;
        }
        if !visited.insert(self.this) {
            return false;
        }
        self.interfaces
            .iter()
            .chain(self.superclass.iter())
            .any(|next| next == target || next.info().reaches(target, visited))
    }

    /// Factory types produce components instead of being components.
    pub fn is_factory(&self) -> bool {
        self.is_assignable_to(&TypeRef::of::<dyn ComponentFactory>())
            || self.is_assignable_to(&TypeRef::of::<dyn ComponentVariantFactory>())
    }

    /// Whether an implementation of this type can be converted to `api`.
    pub fn can_cast(&self, api: &TypeRef) -> bool {
        self.casts.iter().any(|(id, _)| *id == api.id())
    }

    pub(crate) fn cast(&self, api: &TypeRef, raw: &AnyArc) -> Option<Instance> {
        self.casts
            .iter()
            .find(|(id, _)| *id == api.id())
            .and_then(|(_, cast)| cast(raw))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("this", &self.this)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("component", &self.component)
            .field("group", &self.group)
            .field("accepts", &self.accepts)
            .field("casts", &self.casts.len())
            .field("proxy", &self.proxy.is_some())
            .finish()
    }
}

fn caster<T, I>(cast: fn(Arc<T>) -> Arc<I>) -> Caster
where
    T: Send + Sync + 'static,
    I: ?Sized + Send + Sync + 'static,
{
    Arc::new(move |raw: &AnyArc| {
        raw.clone()
            .downcast::<T>()
            .ok()
            .map(|it| Instance::new(cast(it)))
    })
}

/// Typed descriptor builder for a class `T`.
///
/// Conversions registered here are checked by the compiler: `|it| it`
/// coerces `Arc<T>` to `Arc<dyn I>` only when `T: I`.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{ComponentSpec, Reflect, TypeInfo, TypeRef};
///
/// trait Engine: Send + Sync {}
/// impl Reflect for dyn Engine {
///     fn type_info() -> TypeInfo { TypeInfo::interface::<Self>() }
/// }
///
/// struct Diesel;
/// impl Engine for Diesel {}
/// impl Reflect for Diesel {
///     fn type_info() -> TypeInfo {
///         TypeInfo::final_class::<Self>()
///             .implements::<dyn Engine>(|it| it)
///             .component(ComponentSpec::new())
///             .into()
///     }
/// }
///
/// let info = TypeRef::of::<Diesel>().info();
/// assert!(info.is_final());
/// assert!(info.can_cast(&TypeRef::of::<dyn Engine>()));
/// ```
pub struct ClassInfo<T> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect + Send + Sync> ClassInfo<T> {
    fn new(kind: TypeKind) -> Self {
        let mut info = TypeInfo::with_kind(TypeRef::of::<T>(), kind);
        info.casts
            .push((TypeId::of::<T>(), caster::<T, T>(|it| it)));
        ClassInfo {
            info,
            _marker: PhantomData,
        }
    }

    /// Sets the superclass.
    pub fn extends<S: Reflect>(mut self) -> Self {
        self.info.superclass = Some(TypeRef::of::<S>());
        self
    }

    /// Declares a directly implemented interface with its conversion.
    pub fn implements<I>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Reflect + Send + Sync,
    {
        self.info.interfaces.push(TypeRef::of::<I>());
        self.exposes(cast)
    }

    /// Registers a conversion to an interface reached through the superclass
    /// or an explicit component interface list.
    pub fn exposes<I>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Reflect + Send + Sync,
    {
        let id = TypeId::of::<I>();
        self.info.casts.retain(|(existing, _)| *existing != id);
        self.info.casts.push((id, caster(cast)));
        self
    }

    pub fn component(mut self, spec: ComponentSpec) -> Self {
        self.info.component = Some(spec);
        self
    }

    pub fn group(mut self, spec: GroupSpec) -> Self {
        self.info.group = Some(spec);
        self
    }

    /// Marks the class as anonymous: it behaves as if it carried a component
    /// annotation without an interface list.
    pub fn anonymous(mut self) -> Self {
        self.info.anonymous = true;
        self
    }

    /// Declares the primitive twin of a boxed type.
    pub fn boxes<P>(mut self, cast: fn(Arc<T>) -> Arc<P>) -> Self
    where
        P: Reflect + Send + Sync,
    {
        self.info.primitive = Some(TypeRef::of::<P>());
        self.exposes(cast)
    }

    /// Accepts context annotations of type `A`.
    pub fn accepts<A: ContextAnnotation>(mut self) -> Self {
        self.info.accepts.push(AnnotationKey::of::<A>());
        self
    }

    /// Defines a context annotation for all dependencies of this class.
    pub fn defines<A: ContextAnnotation>(mut self, annotation: A) -> Self {
        self.info.defines.push(AnnotationInstance::new(annotation));
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }
}

impl<T> From<ClassInfo<T>> for TypeInfo {
    fn from(builder: ClassInfo<T>) -> Self {
        builder.info
    }
}

macro_rules! reflect_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::final_class::<Self>().build()
                }
            }
        )*
    };
}

reflect_values!(String, bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

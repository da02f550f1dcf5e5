//! Component blueprints and binding descriptors.

use std::fmt;
use std::sync::Arc;

use crate::annotation::AnnotationInstance;
use crate::container::{Arguments, Container};
use crate::context::ComponentContext;
use crate::error::ResolutionResult;
use crate::instance::AnyArc;
use crate::key::{Reflect, TypeRef};
use crate::lifetime::Lifetime;
use crate::registration::{BindingKind, Priority};

/// What a constructor parameter asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// One component bound to the interface
    Component,
    /// Every member of a component group
    Group,
    /// The consumer's own component context
    Context,
}

/// A constructor parameter of a component.
///
/// Components list their dependencies as data, in constructor order; the
/// container resolves them and hands the values to
/// [`Component::construct`] through [`Arguments`].
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{ContextAnnotation, Dependency, DependencyKind, TypeRef};
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Pool(&'static str);
/// impl ContextAnnotation for Pool {
///     const NAME: &'static str = "pool";
/// }
///
/// let dependency = Dependency::component::<String>()
///     .optional()
///     .annotated(Pool("primary"));
///
/// assert_eq!(dependency.kind(), DependencyKind::Component);
/// assert_eq!(dependency.api(), TypeRef::of::<String>());
/// assert!(dependency.is_optional());
/// assert!(!dependency.is_deferred());
/// assert_eq!(dependency.annotations().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Dependency {
    api: TypeRef,
    kind: DependencyKind,
    optional: bool,
    deferred: bool,
    annotations: Vec<AnnotationInstance>,
}

impl Dependency {
    fn new(api: TypeRef, kind: DependencyKind) -> Self {
        Dependency {
            api,
            kind,
            optional: false,
            deferred: false,
            annotations: Vec::new(),
        }
    }

    /// The component bound to `I`.
    pub fn component<I: ?Sized + Reflect>() -> Self {
        Self::new(TypeRef::of::<I>(), DependencyKind::Component)
    }

    /// The members of component group `G`.
    pub fn group<G: ?Sized + Reflect>() -> Self {
        Self::new(TypeRef::of::<G>(), DependencyKind::Group)
    }

    /// The consumer's own context, narrowed to what it accepts.
    pub fn context() -> Self {
        Self::new(TypeRef::of::<ComponentContext>(), DependencyKind::Context)
    }

    /// The container the consumer is resolved in.
    pub fn container() -> Self {
        Self::component::<Container>()
    }

    /// Supplies an absent value instead of failing when the dependency
    /// cannot be resolved or instantiated.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Resolves the dependency on first access instead of with the
    /// consumer. Only meaningful for components.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Adds a context annotation for the resolution of this dependency.
    pub fn annotated(mut self, annotation: impl Into<AnnotationInstance>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn api(&self) -> TypeRef {
        self.api
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred && self.kind == DependencyKind::Component
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }
}

/// An implementation the container can instantiate.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{Arguments, Component, Dependency, Reflect, Registry, ResolutionResult, TypeInfo};
/// use std::sync::Arc;
///
/// struct Settings { url: String }
/// impl Reflect for Settings {
///     fn type_info() -> TypeInfo { TypeInfo::final_class::<Self>().into() }
/// }
///
/// struct Repository { settings: Arc<Settings> }
/// impl Reflect for Repository {
///     fn type_info() -> TypeInfo { TypeInfo::class::<Self>().into() }
/// }
/// impl Component for Repository {
///     fn dependencies() -> Vec<Dependency> {
///         vec![Dependency::component::<Settings>()]
///     }
///     fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
///         Ok(Repository { settings: args.component()? })
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.bind_instance(Settings { url: "postgres://localhost".into() }).unwrap();
/// registry.bind_component::<Repository>().unwrap();
///
/// let container = registry.build();
/// let repository = container.get_component::<Repository>().unwrap();
/// assert_eq!(repository.settings.url, "postgres://localhost");
/// ```
pub trait Component: Reflect + Send + Sync + Sized {
    /// Constructor parameters, in the order `construct` consumes them.
    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    /// Builds the component from its resolved dependencies.
    fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self>;
}

type Constructor = Arc<dyn Fn(&mut Arguments<'_>) -> ResolutionResult<AnyArc> + Send + Sync>;

/// Type-erased constructor of a [`Component`].
#[derive(Clone)]
pub struct Blueprint {
    implementation: TypeRef,
    dependencies: Arc<[Dependency]>,
    constructor: Constructor,
}

impl Blueprint {
    pub fn of<T: Component>() -> Self {
        Blueprint {
            implementation: TypeRef::of::<T>(),
            dependencies: T::dependencies().into(),
            constructor: Arc::new(|args| Ok(Arc::new(T::construct(args)?) as AnyArc)),
        }
    }

    pub fn implementation(&self) -> TypeRef {
        self.implementation
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub(crate) fn construct(&self, args: &mut Arguments<'_>) -> ResolutionResult<AnyArc> {
        (self.constructor)(args)
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("implementation", &self.implementation)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

/// A binding as seen from outside the registry.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{BindingKind, Lifetime, Priority, Reflect, Registry, TypeInfo, TypeRef};
///
/// struct Endpoint(&'static str);
/// impl Reflect for Endpoint {
///     fn type_info() -> TypeInfo { TypeInfo::final_class::<Self>().into() }
/// }
///
/// let mut registry = Registry::new();
/// registry.bind_instance(Endpoint("localhost:8080")).unwrap();
///
/// let descriptors = registry.descriptors();
/// let endpoint = descriptors
///     .iter()
///     .find(|d| d.implementation == TypeRef::of::<Endpoint>())
///     .unwrap();
/// assert_eq!(endpoint.kind, BindingKind::Instance);
/// assert_eq!(endpoint.priority, Priority::Explicit);
/// assert_eq!(endpoint.apis, vec![TypeRef::of::<Endpoint>()]);
/// assert_eq!(endpoint.lifetime, Lifetime::Cached);
/// ```
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Bound implementation, or the factory for factory bindings
    pub implementation: TypeRef,
    /// Interfaces the binding answers for
    pub apis: Vec<TypeRef>,
    /// Groups the binding is a member of
    pub groups: Vec<TypeRef>,
    pub priority: Priority,
    pub lifetime: Lifetime,
    pub kind: BindingKind,
}

impl ComponentDescriptor {
    pub fn type_name(&self) -> &'static str {
        self.implementation.name()
    }

    pub fn is_factory(&self) -> bool {
        matches!(self.kind, BindingKind::Factory | BindingKind::VariantFactory)
    }
}

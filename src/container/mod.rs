//! Component containers.
//!
//! A [`Container`] resolves interfaces to cached or freshly instantiated
//! components. Containers form a tree: a child sees its own bindings first
//! and falls back to its parent's, while parents never see into children.

mod arguments;
mod platform;
mod resolve;

pub use arguments::Arguments;
pub use platform::PlatformContainer;

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;

use crate::annotation::AnnotationInstance;
use crate::cache::ComponentCache;
use crate::config::ContainerSettings;
use crate::context::ContextDefinition;
use crate::error::{BindingError, BindingResult, ResolutionError, ResolutionResult};
use crate::instance::Instance;
use crate::key::{Reflect, TypeRef};
use crate::observer::{observed, ComponentResolutionObserver, TracingObserver};
use crate::registry::{Bindings, Registry};
use crate::termination::ContainerTermination;
use crate::types::TypeInfo;

/// Resolves components.
///
/// Cheap to clone; clones share bindings and cached instances.
///
/// The handle injected into components through
/// [`Dependency::container`](crate::Dependency::container) does not keep the
/// container alive; once every other handle is gone, resolving through it
/// fails with [`ResolutionError::ContainerDropped`].
///
/// # Thread Safety
///
/// Containers are `Send + Sync`. Any number of threads may resolve
/// components at once; a cached component is instantiated once per distinct
/// context even when several threads ask for it at the same time.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{
///     Arguments, Component, ComponentContext, ContextAnnotation, Dependency,
///     Reflect, Registry, ResolutionResult, TypeInfo,
/// };
/// use std::sync::Arc;
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Tenant(&'static str);
/// impl ContextAnnotation for Tenant {
///     const NAME: &'static str = "tenant";
///     fn value(&self) -> String { self.0.to_string() }
/// }
///
/// struct Connection { tenant: String }
/// impl Reflect for Connection {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>().accepts::<Tenant>().into()
///     }
/// }
/// impl Component for Connection {
///     fn dependencies() -> Vec<Dependency> { vec![Dependency::context()] }
///     fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
///         Ok(Connection { tenant: args.context()?.value("tenant", "shared") })
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.bind_component::<Connection>().unwrap();
/// let container = registry.build();
///
/// let acme = container.get_component_in::<Connection>(&[Tenant("acme").into()]).unwrap();
/// let globex = container.get_component_in::<Connection>(&[Tenant("globex").into()]).unwrap();
/// let shared = container.get_component::<Connection>().unwrap();
///
/// assert_eq!(acme.tenant, "acme");
/// assert_eq!(globex.tenant, "globex");
/// assert_eq!(shared.tenant, "shared");
///
/// // Same context, same instance
/// let again = container.get_component_in::<Connection>(&[Tenant("acme").into()]).unwrap();
/// assert!(Arc::ptr_eq(&acme, &again));
/// ```
#[derive(Clone)]
pub struct Container {
    link: Link,
    observer: Option<Arc<dyn ComponentResolutionObserver>>,
    termination: ContainerTermination,
    settings: ContainerSettings,
}

#[derive(Clone)]
enum Link {
    Owned(Arc<ContainerInner>),
    /// Handle injected into a component, which the container may cache
    Injected(Weak<ContainerInner>),
}

impl Link {
    fn upgrade(&self) -> Option<Arc<ContainerInner>> {
        match self {
            Link::Owned(inner) => Some(inner.clone()),
            Link::Injected(inner) => inner.upgrade(),
        }
    }
}

pub(crate) enum Parent {
    Root,
    /// Child made by `make_child`; keeps its parent alive
    Child(Arc<ContainerInner>),
    /// Nested container of a factory, cached by its parent
    Nested(Weak<ContainerInner>),
}

pub(crate) struct ContainerInner {
    /// Address of this container; identifies it in cache keys
    pub(crate) domain: usize,
    pub(crate) registry: Registry,
    parent: Parent,
    pub(crate) cache: ComponentCache,
    /// Nested factory containers, keyed by factory binding and context
    pub(crate) factories: ComponentCache,
    termination: ContainerTermination,
    /// Shared by the whole tree; serializes instantiation of cyclic graphs
    pub(crate) instantiation: Arc<ReentrantMutex<()>>,
    observer: Option<Arc<dyn ComponentResolutionObserver>>,
}

impl ContainerInner {
    pub(crate) fn new(
        registry: Registry,
        parent: Parent,
        termination: ContainerTermination,
        instantiation: Arc<ReentrantMutex<()>>,
    ) -> Arc<Self> {
        let mut observers = registry.observers().to_vec();
        if registry.settings().trace_resolution {
            observers.push(Arc::new(TracingObserver));
        }
        let observer = observed(observers);

        Arc::new_cyclic(|this: &Weak<ContainerInner>| ContainerInner {
            domain: this.as_ptr() as *const () as usize,
            registry,
            parent,
            cache: ComponentCache::new(),
            factories: ComponentCache::new(),
            termination,
            instantiation,
            observer,
        })
    }

    /// Nested container for a factory of `parent`.
    pub(crate) fn nested(registry: Registry, parent: &Arc<ContainerInner>) -> Arc<Self> {
        Self::new(
            registry,
            Parent::Nested(Arc::downgrade(parent)),
            parent.termination.clone(),
            parent.instantiation.clone(),
        )
    }

    pub(crate) fn parent(&self) -> Option<Arc<ContainerInner>> {
        match &self.parent {
            Parent::Root => None,
            Parent::Child(parent) => Some(parent.clone()),
            Parent::Nested(parent) => parent.upgrade(),
        }
    }

    pub(crate) fn settings(&self) -> &ContainerSettings {
        self.registry.settings()
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if matches!(self.parent, Parent::Root) {
            self.termination.run();
        }
    }
}

impl Container {
    pub(crate) fn root(mut registry: Registry) -> Self {
        let termination = ContainerTermination::new();
        if let Err(error) = registry.bind_instance(termination.clone()) {
            tracing::warn!(%error, "container termination not bound");
        }
        let inner = ContainerInner::new(
            registry,
            Parent::Root,
            termination,
            Arc::new(ReentrantMutex::new(())),
        );
        Self::handle(inner, None)
    }

    pub(crate) fn handle(
        inner: Arc<ContainerInner>,
        extra: Option<Arc<dyn ComponentResolutionObserver>>,
    ) -> Self {
        Self::linked(&inner, Link::Owned(inner.clone()), extra)
    }

    /// Handle for injection into components of `inner`.
    pub(crate) fn injected(
        inner: &Arc<ContainerInner>,
        extra: Option<Arc<dyn ComponentResolutionObserver>>,
    ) -> Self {
        Self::linked(inner, Link::Injected(Arc::downgrade(inner)), extra)
    }

    fn linked(
        inner: &Arc<ContainerInner>,
        link: Link,
        extra: Option<Arc<dyn ComponentResolutionObserver>>,
    ) -> Self {
        Container {
            link,
            observer: observed(inner.observer.iter().cloned().chain(extra)),
            termination: inner.termination.clone(),
            settings: inner.settings().clone(),
        }
    }

    /// The component bound to `I`.
    pub fn get_component<I>(&self) -> ResolutionResult<Arc<I>>
    where
        I: ?Sized + Reflect + Send + Sync,
    {
        self.get_component_in::<I>(&[])
    }

    /// The component bound to `I`, `None` when nothing is bound to it.
    pub fn try_get_component<I>(&self) -> ResolutionResult<Option<Arc<I>>>
    where
        I: ?Sized + Reflect + Send + Sync,
    {
        let api = TypeRef::of::<I>();
        match self.resolve_instance(api, &root_definition(api, &[]))? {
            Some(instance) => instance.expect::<I>().map(Some),
            None => Ok(None),
        }
    }

    /// The component bound to `I`, resolved with the given context
    /// annotations.
    pub fn get_component_in<I>(&self, annotations: &[AnnotationInstance]) -> ResolutionResult<Arc<I>>
    where
        I: ?Sized + Reflect + Send + Sync,
    {
        let api = TypeRef::of::<I>();
        self.resolve_instance(api, &root_definition(api, annotations))?
            .ok_or_else(|| ResolutionError::Unresolved {
                api: api.name(),
                path: api.name().to_string(),
            })?
            .expect::<I>()
    }

    /// The component bound to `I` in a transient child container holding
    /// `bindings`.
    pub fn get_component_with<I, B>(&self, bindings: &B) -> ResolutionResult<Arc<I>>
    where
        I: ?Sized + Reflect + Send + Sync,
        B: Bindings + ?Sized,
    {
        self.make_child(bindings)?.get_component::<I>()
    }

    /// The members of group `G`, ancestors' members first.
    pub fn get_component_group<G>(&self) -> ResolutionResult<Vec<Arc<G>>>
    where
        G: ?Sized + Reflect + Send + Sync,
    {
        let api = TypeRef::of::<G>();
        self.resolve_members(api, &root_definition(api, &[]))?
            .iter()
            .map(|member| member.expect::<G>())
            .collect()
    }

    /// Child container with additional bindings.
    ///
    /// The child resolves its own bindings first, then the parent's. Cached
    /// components of the parent are shared; the child caches its own.
    pub fn make_child<B: Bindings + ?Sized>(&self, bindings: &B) -> BindingResult<Container> {
        let parent = self.link.upgrade().ok_or(BindingError::ContainerDropped)?;
        let mut registry = Registry::with_settings(self.settings.clone());
        registry.install(bindings)?;
        let inner = ContainerInner::new(
            registry,
            Parent::Child(parent.clone()),
            parent.termination.clone(),
            parent.instantiation.clone(),
        );
        Ok(Self::handle(inner, self.observer.clone()))
    }

    /// Handle to the same container that also notifies `observer`.
    pub fn observed(&self, observer: Arc<dyn ComponentResolutionObserver>) -> Container {
        Container {
            link: self.link.clone(),
            observer: observed(self.observer.iter().cloned().chain(Some(observer))),
            termination: self.termination.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn termination(&self) -> ContainerTermination {
        self.termination.clone()
    }

    /// Runs the termination jobs of the container tree.
    pub fn shutdown(&self) {
        self.termination.run();
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Number of component instances cached by this container; zero once an
    /// injected handle outlives it.
    pub fn cached_components(&self) -> usize {
        self.link.upgrade().map_or(0, |inner| inner.cache.len())
    }

    /// Untyped resolution; `None` when nothing is bound to `api`.
    pub fn resolve_instance(&self, api: TypeRef, definition: &ContextDefinition) -> ResolutionResult<Option<Instance>> {
        self.inner()?.resolve_root(api, definition, self.observer.clone())
    }

    fn resolve_members(&self, api: TypeRef, definition: &ContextDefinition) -> ResolutionResult<Vec<Instance>> {
        self.inner()?.resolve_root_group(api, definition, self.observer.clone())
    }

    pub(crate) fn inner(&self) -> ResolutionResult<Arc<ContainerInner>> {
        self.link.upgrade().ok_or(ResolutionError::ContainerDropped)
    }
}

fn root_definition(api: TypeRef, annotations: &[AnnotationInstance]) -> ContextDefinition {
    let mut definition = ContextDefinition::new();
    definition.expand(annotations, Some(api));
    definition
}

impl Reflect for Container {
    fn type_info() -> TypeInfo {
        TypeInfo::final_class::<Self>().into()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(inner) = self.link.upgrade() else {
            return f.debug_struct("Container").field("dropped", &true).finish();
        };
        f.debug_struct("Container")
            .field("domain", &inner.domain)
            .field("bindings", &inner.registry.len())
            .field("cached", &inner.cache.len())
            .field("root", &matches!(inner.parent, Parent::Root))
            .field("injected", &matches!(self.link, Link::Injected(_)))
            .finish()
    }
}

//! Deferred component handles.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{ResolutionError, ResolutionResult};
use crate::instance::Instance;
use crate::key::TypeRef;

type Resolver = Box<dyn Fn() -> ResolutionResult<Instance> + Send + Sync>;

/// Storage behind a [`Reference`]: filled up front, filled later by the
/// container (circular references) or on first access (deferred
/// dependencies).
pub(crate) struct Slot {
    api: TypeRef,
    cell: OnceCell<Instance>,
    resolver: Option<Resolver>,
}

impl Slot {
    pub(crate) fn ready(api: TypeRef, instance: Instance) -> Arc<Slot> {
        Arc::new(Slot {
            api,
            cell: OnceCell::with_value(instance),
            resolver: None,
        })
    }

    pub(crate) fn pending(api: TypeRef) -> Arc<Slot> {
        Arc::new(Slot {
            api,
            cell: OnceCell::new(),
            resolver: None,
        })
    }

    pub(crate) fn deferred<F>(api: TypeRef, resolver: F) -> Arc<Slot>
    where
        F: Fn() -> ResolutionResult<Instance> + Send + Sync + 'static,
    {
        Arc::new(Slot {
            api,
            cell: OnceCell::new(),
            resolver: Some(Box::new(resolver)),
        })
    }

    pub(crate) fn api(&self) -> TypeRef {
        self.api
    }

    /// Publishes the instance; later calls are ignored.
    pub(crate) fn fill(&self, instance: Instance) {
        let _ = self.cell.set(instance);
    }

    pub(crate) fn get(&self) -> ResolutionResult<Instance> {
        if let Some(instance) = self.cell.get() {
            return Ok(instance.clone());
        }
        match &self.resolver {
            Some(resolve) => self.cell.get_or_try_init(|| resolve()).cloned(),
            None => Err(ResolutionError::PrematureAccess(self.api.name())),
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The interface's proxy while a circular reference waits for its
    /// target; `None` once filled and for deferred slots.
    pub(crate) fn stand_in(self: &Arc<Self>) -> Option<Instance> {
        if self.is_ready() || self.resolver.is_some() {
            return None;
        }
        self.api.info().make_proxy(self.clone())
    }
}

/// Handle to a component that may not exist yet.
///
/// Injected for deferred dependencies, which resolve on first
/// [`get`](Self::get), and for circular dependencies through an interface,
/// which become available once the component on the other end of the cycle
/// has been instantiated. Interface proxies (see
/// [`TypeInfo::proxy`](crate::TypeInfo::proxy)) forward through one.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{
///     Arguments, Component, Dependency, Reference, Reflect, Registry,
///     ResolutionResult, TypeInfo,
/// };
///
/// struct Expensive;
/// impl Reflect for Expensive {
///     fn type_info() -> TypeInfo { TypeInfo::final_class::<Self>().into() }
/// }
/// impl Component for Expensive {
///     fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> { Ok(Expensive) }
/// }
///
/// struct Consumer {
///     expensive: Reference<Expensive>,
/// }
/// impl Reflect for Consumer {
///     fn type_info() -> TypeInfo { TypeInfo::final_class::<Self>().into() }
/// }
/// impl Component for Consumer {
///     fn dependencies() -> Vec<Dependency> {
///         vec![Dependency::component::<Expensive>().deferred()]
///     }
///     fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
///         Ok(Consumer { expensive: args.reference()? })
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.bind_component::<Expensive>().unwrap();
/// registry.bind_component::<Consumer>().unwrap();
/// let container = registry.build();
///
/// let consumer = container.get_component::<Consumer>().unwrap();
/// assert!(!consumer.expensive.is_ready());
/// assert!(consumer.expensive.get().is_ok());
/// assert!(consumer.expensive.is_ready());
/// ```
pub struct Reference<T: ?Sized> {
    slot: Arc<Slot>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Reference<T> {
    pub(crate) fn new(slot: Arc<Slot>) -> Self {
        Reference {
            slot,
            _marker: PhantomData,
        }
    }

    /// The referenced component.
    ///
    /// Fails with [`ResolutionError::PrematureAccess`] while the other end of
    /// a circular reference is still being instantiated.
    pub fn get(&self) -> ResolutionResult<Arc<T>> {
        self.slot.get()?.expect::<T>()
    }

    /// Whether the component is available without resolving it.
    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// The interface the reference was declared with.
    pub fn api(&self) -> TypeRef {
        self.slot.api()
    }
}

impl<T: ?Sized> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Reference {
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("api", &self.slot.api)
            .field("ready", &self.slot.is_ready())
            .finish()
    }
}

/// An instance announced to observers before it is available.
///
/// Observers receive it in
/// [`instantiated`](crate::ComponentResolutionObserver::instantiated); it is
/// filled after every observer has returned, so observers cannot call into
/// the component during the notification.
#[derive(Clone)]
pub struct InstanceHandle {
    implementation: TypeRef,
    cell: Arc<OnceCell<Instance>>,
}

impl InstanceHandle {
    pub(crate) fn new(implementation: TypeRef) -> Self {
        InstanceHandle {
            implementation,
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub(crate) fn fill(&self, instance: Instance) {
        let _ = self.cell.set(instance);
    }

    pub fn implementation(&self) -> TypeRef {
        self.implementation
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The instance as its implementation type, once available.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.cell.get()?.downcast::<T>()
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("implementation", &self.implementation)
            .field("ready", &self.is_ready())
            .finish()
    }
}

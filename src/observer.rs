//! Resolution observers.
//!
//! Observers receive a synchronous event stream for every resolution: the
//! components being resolved, the dependency edges walked, and the
//! instances being created. They are meant for diagnostics and tooling.

use std::sync::Arc;

use crate::context::ComponentContext;
use crate::graph::InstanceHandle;
use crate::key::TypeRef;

/// Hooks into component resolution.
///
/// Every method has a no-op default. Calls are made on the resolving thread
/// in the middle of resolution, so implementations should be quick and must
/// not resolve components from the container themselves.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{
///     Arguments, Component, ComponentContext, ComponentResolutionObserver, Reflect,
///     Registry, ResolutionResult, TypeInfo, TypeRef,
/// };
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Recorder {
///     resolved: Mutex<Vec<&'static str>>,
/// }
///
/// impl ComponentResolutionObserver for Recorder {
///     fn resolved(&self, _api: &TypeRef, implementation: &TypeRef, _context: &ComponentContext) {
///         self.resolved.lock().unwrap().push(implementation.name());
///     }
/// }
///
/// struct Service;
/// impl Reflect for Service {
///     fn type_info() -> TypeInfo { TypeInfo::class::<Self>().into() }
/// }
/// impl Component for Service {
///     fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> { Ok(Service) }
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let mut registry = Registry::new();
/// registry.bind_component::<Service>().unwrap();
/// registry.add_observer(recorder.clone());
///
/// let container = registry.build();
/// container.get_component::<Service>().unwrap();
/// assert_eq!(recorder.resolved.lock().unwrap().len(), 1);
/// ```
pub trait ComponentResolutionObserver: Send + Sync {
    /// A component is about to be resolved for `api`.
    fn resolving(&self, api: &TypeRef, implementation: &TypeRef, context: &ComponentContext) {
        let _ = (api, implementation, context);
    }

    /// Resolution follows a dependency of `declaring`.
    fn descend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        let _ = (declaring, dependency);
    }

    /// Resolution returns from a dependency of `declaring`.
    fn ascend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        let _ = (declaring, dependency);
    }

    /// `api` resolved to `implementation` with its final context.
    fn resolved(&self, api: &TypeRef, implementation: &TypeRef, context: &ComponentContext) {
        let _ = (api, implementation, context);
    }

    /// `implementation` is about to be instantiated.
    fn instantiating(&self, implementation: &TypeRef, context: &ComponentContext) {
        let _ = (implementation, context);
    }

    /// `implementation` was instantiated.
    ///
    /// The handle is filled after every observer has returned.
    fn instantiated(&self, implementation: &TypeRef, context: &ComponentContext, instance: &InstanceHandle) {
        let _ = (implementation, context, instance);
    }

    /// Observers this one dispatches to, for flattening. Empty for leaf
    /// observers.
    fn members(&self) -> Vec<Arc<dyn ComponentResolutionObserver>> {
        Vec::new()
    }
}

/// Dispatches every event to its members in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ComponentResolutionObserver>>,
}

impl CompositeObserver {
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ComponentResolutionObserver for CompositeObserver {
    fn resolving(&self, api: &TypeRef, implementation: &TypeRef, context: &ComponentContext) {
        for observer in &self.observers {
            observer.resolving(api, implementation, context);
        }
    }

    fn descend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        for observer in &self.observers {
            observer.descend(declaring, dependency);
        }
    }

    fn ascend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        for observer in &self.observers {
            observer.ascend(declaring, dependency);
        }
    }

    fn resolved(&self, api: &TypeRef, implementation: &TypeRef, context: &ComponentContext) {
        for observer in &self.observers {
            observer.resolved(api, implementation, context);
        }
    }

    fn instantiating(&self, implementation: &TypeRef, context: &ComponentContext) {
        for observer in &self.observers {
            observer.instantiating(implementation, context);
        }
    }

    fn instantiated(&self, implementation: &TypeRef, context: &ComponentContext, instance: &InstanceHandle) {
        for observer in &self.observers {
            observer.instantiated(implementation, context, instance);
        }
    }

    fn members(&self) -> Vec<Arc<dyn ComponentResolutionObserver>> {
        self.observers.clone()
    }
}

/// Combines observers into one.
///
/// Nested composites are flattened and an observer that appears more than
/// once is kept at its first position. Returns `None` when nothing is left.
pub fn observed<I>(observers: I) -> Option<Arc<dyn ComponentResolutionObserver>>
where
    I: IntoIterator<Item = Arc<dyn ComponentResolutionObserver>>,
{
    let mut flat: Vec<Arc<dyn ComponentResolutionObserver>> = Vec::new();
    for observer in observers {
        flatten(observer, &mut flat);
    }
    match flat.len() {
        0 => None,
        1 => flat.pop(),
        _ => Some(Arc::new(CompositeObserver { observers: flat })),
    }
}

fn flatten(observer: Arc<dyn ComponentResolutionObserver>, into: &mut Vec<Arc<dyn ComponentResolutionObserver>>) {
    let members = observer.members();
    if members.is_empty() {
        if !into.iter().any(|known| same(known, &observer)) {
            into.push(observer);
        }
        return;
    }
    for member in members {
        flatten(member, into);
    }
}

// Data pointer only: vtable pointers of the same object may differ
fn same(a: &Arc<dyn ComponentResolutionObserver>, b: &Arc<dyn ComponentResolutionObserver>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const u8,
        Arc::as_ptr(b) as *const u8,
    )
}

/// Emits every resolution event as a `tracing` event at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ComponentResolutionObserver for TracingObserver {
    fn resolving(&self, api: &TypeRef, implementation: &TypeRef, context: &ComponentContext) {
        tracing::trace!(api = %api, implementation = %implementation, context = %context, "resolving");
    }

    fn descend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        tracing::trace!(declaring = %declaring, dependency = %dependency, "descend");
    }

    fn ascend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        tracing::trace!(declaring = %declaring, dependency = %dependency, "ascend");
    }

    fn resolved(&self, api: &TypeRef, implementation: &TypeRef, context: &ComponentContext) {
        tracing::trace!(api = %api, implementation = %implementation, context = %context, "resolved");
    }

    fn instantiating(&self, implementation: &TypeRef, context: &ComponentContext) {
        tracing::trace!(implementation = %implementation, context = %context, "instantiating");
    }

    fn instantiated(&self, implementation: &TypeRef, context: &ComponentContext, _: &InstanceHandle) {
        tracing::trace!(implementation = %implementation, context = %context, "instantiated");
    }
}

//! Resolution path tracking and circular dependency detection.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;

use crate::config::ContainerSettings;
use crate::context::ComponentContext;
use crate::error::{ResolutionError, ResolutionResult};
use crate::instance::AnyArc;
use crate::key::TypeRef;
use crate::observer::ComponentResolutionObserver;
use crate::types::TypeInfo;

use super::reference::Slot;
use super::Node;

/// What makes two resolutions the same node: the container, the binding and
/// the context annotations the implementation accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Identity {
    pub(crate) domain: usize,
    pub(crate) binding: usize,
    pub(crate) context: ComponentContext,
}

/// One step of the resolution path.
#[derive(Debug, Clone)]
pub struct PathEntry {
    identity: Identity,
    api: TypeRef,
    implementation: TypeRef,
    context: ComponentContext,
}

impl PathEntry {
    /// Interface the component was requested through.
    pub fn api(&self) -> TypeRef {
        self.api
    }

    pub fn implementation(&self) -> TypeRef {
        self.implementation
    }

    /// Context annotations the implementation accepted at this step.
    pub fn context(&self) -> &ComponentContext {
        &self.context
    }
}

/// Nodes already resolved in a traversal: the identity, the interface and
/// the defined context determine the whole subtree.
type Resolved = HashMap<(Identity, TypeRef, ComponentContext), Arc<Node>, RandomState>;

/// State of one root resolution.
///
/// Holds the path of components being resolved, the stack of components
/// being instantiated, the circular reference slots waiting for their
/// target, and the nodes resolved so far. Each `get_component` call creates
/// its own traversal; nothing is shared between threads.
pub struct Traversal {
    path: Vec<PathEntry>,
    building: Vec<&'static str>,
    pending: Vec<(Identity, Arc<Slot>)>,
    resolved: Resolved,
    // deferred dependencies whose graph encloses this traversal
    deferring: Vec<TypeRef>,
    observer: Option<Arc<dyn ComponentResolutionObserver>>,
    max_depth: usize,
    proxy_interfaces: bool,
}

impl Traversal {
    pub(crate) fn new(
        settings: &ContainerSettings,
        observer: Option<Arc<dyn ComponentResolutionObserver>>,
    ) -> Self {
        Traversal {
            path: Vec::new(),
            building: Vec::new(),
            pending: Vec::new(),
            resolved: Resolved::default(),
            deferring: Vec::new(),
            observer,
            max_depth: settings.max_depth,
            proxy_interfaces: settings.proxy_circular_interfaces,
        }
    }

    /// Traversal for the graph of a deferred dependency on `api`, or `None`
    /// when that graph is already being resolved around this one.
    ///
    /// It resolves nodes only and reports nothing to observers.
    pub(crate) fn deferred(&self, api: TypeRef) -> Option<Traversal> {
        if self.deferring.contains(&api) {
            return None;
        }
        let mut deferring = self.deferring.clone();
        deferring.push(api);
        Some(Traversal {
            path: Vec::new(),
            building: Vec::new(),
            pending: Vec::new(),
            resolved: Resolved::default(),
            deferring,
            observer: None,
            max_depth: self.max_depth,
            proxy_interfaces: self.proxy_interfaces,
        })
    }

    /// The node resolved earlier in this traversal for the same identity,
    /// interface and defined context.
    pub(crate) fn memoized(
        &self,
        identity: &Identity,
        api: TypeRef,
        defined: &ComponentContext,
    ) -> Option<Arc<Node>> {
        self.resolved
            .get(&(identity.clone(), api, defined.clone()))
            .cloned()
    }

    pub(crate) fn memoize(&mut self, identity: Identity, api: TypeRef, defined: ComponentContext, node: Arc<Node>) {
        self.resolved.insert((identity, api, defined), node);
    }

    /// Resolves the node for `identity` unless it is already on the path.
    ///
    /// A repeated identity requested through an interface with a proxy
    /// becomes a cycle node whose reference is filled once the component on
    /// the path is instantiated. Through a concrete type, or an interface
    /// without a proxy, the cycle cannot be broken and resolution fails.
    pub(crate) fn follow<F>(
        &mut self,
        identity: Identity,
        api: TypeRef,
        implementation: TypeRef,
        resolve: F,
    ) -> ResolutionResult<Arc<Node>>
    where
        F: FnOnce(&mut Traversal) -> ResolutionResult<Arc<Node>>,
    {
        if let Some(position) = self.path.iter().position(|entry| entry.identity == identity) {
            let cycle = self.describe_from(position, api);
            if self.proxy_interfaces && api.is_interface() && api.info().has_proxy() {
                tracing::debug!(api = %api, path = %cycle, "breaking circular reference");
                let slot = Slot::pending(api);
                self.pending.push((identity.clone(), slot.clone()));
                return Ok(Arc::new(Node::cycle(api, implementation, identity.context, slot)));
            }
            return Err(ResolutionError::Circular {
                api: api.name(),
                path: cycle,
            });
        }

        if self.path.len() >= self.max_depth {
            return Err(ResolutionError::DepthExceeded(self.path.len()));
        }

        let context = identity.context.clone();
        if let Some(observer) = &self.observer {
            observer.resolving(&api, &implementation, &context);
        }
        tracing::trace!(api = %api, implementation = %implementation, context = %context, "resolving");

        self.path.push(PathEntry {
            identity,
            api,
            implementation,
            context,
        });
        let result = resolve(self);
        self.path.pop();

        if let (Ok(node), Some(observer)) = (&result, &self.observer) {
            observer.resolved(&api, &node.type_ref(), node.context());
        }
        result
    }

    pub(crate) fn descend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        if let Some(observer) = &self.observer {
            observer.descend(declaring, dependency);
        }
    }

    pub(crate) fn ascend(&self, declaring: &TypeRef, dependency: &TypeRef) {
        if let Some(observer) = &self.observer {
            observer.ascend(declaring, dependency);
        }
    }

    pub(crate) fn observer(&self) -> Option<&Arc<dyn ComponentResolutionObserver>> {
        self.observer.as_ref()
    }

    /// Runs `instantiate` with `component` on the instantiation stack.
    pub(crate) fn building<T, F>(&mut self, component: &'static str, instantiate: F) -> ResolutionResult<T>
    where
        F: FnOnce(&mut Traversal) -> ResolutionResult<T>,
    {
        self.building.push(component);
        let result = instantiate(self);
        self.building.pop();
        result
    }

    /// Instantiation stack rendered for error messages.
    pub(crate) fn instantiation_path(&self) -> String {
        self.building.join(" -> ")
    }

    /// Fills the circular references waiting for `identity`.
    pub(crate) fn instantiated(&mut self, identity: &Identity, info: &TypeInfo, raw: &AnyArc) {
        self.pending.retain(|(waiting, slot)| {
            if waiting != identity {
                return true;
            }
            match info.cast(&slot.api(), raw) {
                Some(instance) => slot.fill(instance),
                None => tracing::warn!(api = %slot.api(), "circular reference target cannot be cast"),
            }
            false
        });
    }

    /// The current resolution path.
    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    /// The current path rendered as `a -> b -> c`.
    pub fn describe(&self) -> String {
        self.path
            .iter()
            .map(|entry| entry.implementation.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn describe_from(&self, position: usize, api: TypeRef) -> String {
        self.path[position..]
            .iter()
            .map(|entry| entry.implementation.name())
            .chain(std::iter::once(api.name()))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

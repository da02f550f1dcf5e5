//! Dependency graph model.
//!
//! Resolution runs in two phases per root call. The graph phase resolves the
//! requested interface to a tree of [`Node`]s, narrowing and collecting
//! context annotations along the way so that every node knows the exact
//! context it will be cached under. The instance phase then walks the tree
//! and instantiates what the component cache does not already hold.
//!
//! A node reached twice in one traversal is resolved once. A cached
//! component whose active context is already known for the defined context
//! becomes a leaf holding its instance, so its dependencies are not visited.

mod reference;
mod traversal;

pub use reference::{InstanceHandle, Reference};
pub use traversal::{PathEntry, Traversal};

pub(crate) use reference::Slot;
pub(crate) use traversal::Identity;

use std::sync::Arc;

use crate::container::{Arguments, ContainerInner};
use crate::context::{ComponentContext, ContextDefinition};
use crate::descriptors::Blueprint;
use crate::error::{ResolutionError, ResolutionResult};
use crate::instance::{AnyArc, Instance};
use crate::key::TypeRef;
use crate::registration::Binding;

/// Resolves interfaces and groups to nodes.
pub trait DependencyGraph {
    /// The node for `api`, or `None` when nothing is bound to it.
    fn resolve_component(
        &self,
        api: TypeRef,
        context: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Option<Arc<Node>>>;

    /// The node for the members of group `api`; empty when none are bound.
    fn resolve_group(
        &self,
        api: TypeRef,
        context: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Arc<Node>>;
}

/// A resolved component or group, ready to be instantiated.
pub struct Node {
    api: TypeRef,
    implementation: TypeRef,
    context: ComponentContext,
    kind: NodeKind,
}

pub(crate) enum NodeKind {
    /// Bound instance, already converted to the node's interface
    Constant(Instance),
    /// Cached component found without resolving its dependencies
    Cached {
        instance: Instance,
        injected: ComponentContext,
    },
    /// Constructed implementation
    Component(ComponentNode),
    /// Component bound by a factory in its nested container
    Produced(Arc<Node>),
    /// Component group members
    Group(Vec<Arc<Node>>),
    /// Broken circular reference
    Cycle(Arc<Slot>),
    /// Deferred dependency; `settled` once its context no longer depends on
    /// the path it was resolved on
    Lazy { slot: Arc<Slot>, settled: bool },
}

pub(crate) struct ComponentNode {
    pub(crate) container: Arc<ContainerInner>,
    pub(crate) binding: Arc<Binding>,
    pub(crate) blueprint: Blueprint,
    pub(crate) identity: Identity,
    pub(crate) edges: Vec<Edge>,
    pub(crate) injected: ComponentContext,
    pub(crate) cyclic: bool,
    pub(crate) settled: bool,
}

/// What a constructor parameter resolved to.
pub(crate) enum Edge {
    Node(Arc<Node>),
    /// The consumer's own context
    Context,
    /// Optional dependency that could not be resolved
    Absent,
}

/// A resolved constructor argument.
pub(crate) enum Value {
    Instance(Instance),
    Slot(Arc<Slot>),
    Group(Vec<Instance>),
    Context(ComponentContext),
    Absent,
}

impl Node {
    pub(crate) fn constant(api: TypeRef, implementation: TypeRef, instance: Instance) -> Self {
        Node {
            api,
            implementation,
            context: ComponentContext::empty(),
            kind: NodeKind::Constant(instance),
        }
    }

    /// Node for a cached instance whose active context is known.
    pub(crate) fn cached(
        api: TypeRef,
        implementation: TypeRef,
        context: ComponentContext,
        injected: ComponentContext,
        instance: Instance,
    ) -> Self {
        Node {
            api,
            implementation,
            context,
            kind: NodeKind::Cached { instance, injected },
        }
    }

    pub(crate) fn component(api: TypeRef, context: ComponentContext, component: ComponentNode) -> Self {
        Node {
            api,
            implementation: component.binding.implementation,
            context,
            kind: NodeKind::Component(component),
        }
    }

    pub(crate) fn produced(api: TypeRef, context: ComponentContext, node: Arc<Node>) -> Self {
        Node {
            api,
            implementation: node.implementation,
            context,
            kind: NodeKind::Produced(node),
        }
    }

    pub(crate) fn group(api: TypeRef, context: ComponentContext, members: Vec<Arc<Node>>) -> Self {
        Node {
            api,
            implementation: api,
            context,
            kind: NodeKind::Group(members),
        }
    }

    pub(crate) fn cycle(
        api: TypeRef,
        implementation: TypeRef,
        context: ComponentContext,
        slot: Arc<Slot>,
    ) -> Self {
        Node {
            api,
            implementation,
            context,
            kind: NodeKind::Cycle(slot),
        }
    }

    /// Deferred dependency cached under the context of its target.
    pub(crate) fn lazy(api: TypeRef, context: ComponentContext, settled: bool, slot: Arc<Slot>) -> Self {
        Node {
            api,
            implementation: api,
            context,
            kind: NodeKind::Lazy { slot, settled },
        }
    }

    /// The interface this node was resolved for.
    pub fn api(&self) -> TypeRef {
        self.api
    }

    /// The type pertaining at this node: the implementation for components,
    /// the interface for groups and deferred dependencies.
    pub fn type_ref(&self) -> TypeRef {
        self.implementation
    }

    /// Context the node is cached under.
    pub fn context(&self) -> &ComponentContext {
        &self.context
    }

    /// Whether this node is a broken circular reference.
    pub fn is_cycle(&self) -> bool {
        matches!(self.kind, NodeKind::Cycle(_))
    }

    /// Whether a broken circular reference exists at or below this node.
    pub fn is_cyclic(&self) -> bool {
        match &self.kind {
            NodeKind::Cycle(_) => true,
            NodeKind::Component(component) => component.cyclic,
            NodeKind::Produced(node) => node.is_cyclic(),
            NodeKind::Group(members) => members.iter().any(|member| member.is_cyclic()),
            NodeKind::Constant(_) | NodeKind::Cached { .. } | NodeKind::Lazy { .. } => false,
        }
    }

    /// Whether the node is the same wherever its identity is resolved:
    /// no broken circular reference and no deferred dependency cut short
    /// below it.
    pub(crate) fn is_settled(&self) -> bool {
        match &self.kind {
            NodeKind::Cycle(_) => false,
            NodeKind::Lazy { settled, .. } => *settled,
            NodeKind::Component(component) => component.settled,
            NodeKind::Produced(node) => node.is_settled(),
            NodeKind::Group(members) => members.iter().all(|member| member.is_settled()),
            NodeKind::Constant(_) | NodeKind::Cached { .. } => true,
        }
    }

    pub(crate) fn members(&self) -> Vec<Arc<Node>> {
        match &self.kind {
            NodeKind::Group(members) => members.clone(),
            _ => Vec::new(),
        }
    }

    /// Context handed to a component factory.
    pub(crate) fn injected_context(&self) -> ComponentContext {
        match &self.kind {
            NodeKind::Component(component) => component.injected.clone(),
            NodeKind::Cached { injected, .. } => injected.clone(),
            _ => ComponentContext::empty(),
        }
    }

    /// Instantiates the node, or takes its instance from the cache.
    pub(crate) fn instance(&self, traversal: &mut Traversal) -> ResolutionResult<Value> {
        match &self.kind {
            NodeKind::Constant(instance) | NodeKind::Cached { instance, .. } => {
                Ok(Value::Instance(instance.clone()))
            }
            NodeKind::Component(component) => self.instantiate(component, traversal),
            NodeKind::Produced(node) => node.instance(traversal),
            NodeKind::Group(members) => {
                let mut instances = Vec::with_capacity(members.len());
                for member in members {
                    match member.instance(traversal)? {
                        Value::Instance(instance) => instances.push(instance),
                        Value::Slot(slot) => instances.push(slot.get()?),
                        _ => return Err(ResolutionError::TypeMismatch(self.api.name())),
                    }
                }
                Ok(Value::Group(instances))
            }
            NodeKind::Cycle(slot) | NodeKind::Lazy { slot, .. } => Ok(Value::Slot(slot.clone())),
        }
    }

    fn instantiate(&self, component: &ComponentNode, traversal: &mut Traversal) -> ResolutionResult<Value> {
        let container = &component.container;
        let binding = &component.binding;

        // Components on a cycle are instantiated under the container tree's
        // lock: two threads entering the same cycle from opposite ends would
        // otherwise wait on each other's cache entries.
        let _guard = component.cyclic.then(|| container.instantiation.lock());

        let raw = if binding.lifetime().is_cached() {
            container.cache.lookup(
                container.domain,
                binding.id,
                &self.context,
                &self.api,
                || self.construct(component, traversal),
            )?
        } else {
            self.construct(component, traversal)?
        };

        binding
            .cast(&self.api, &raw)
            .map(Value::Instance)
            .ok_or(ResolutionError::TypeMismatch(self.api.name()))
    }

    fn construct(&self, component: &ComponentNode, traversal: &mut Traversal) -> ResolutionResult<AnyArc> {
        let implementation = self.implementation;
        traversal.building(implementation.name(), |traversal| {
            if let Some(observer) = traversal.observer() {
                observer.instantiating(&implementation, &component.injected);
            }

            let dependencies = component.blueprint.dependencies();
            let mut values = Vec::with_capacity(component.edges.len());
            for (dependency, edge) in dependencies.iter().zip(&component.edges) {
                let value = match edge {
                    Edge::Context => Value::Context(component.injected.clone()),
                    Edge::Absent => Value::Absent,
                    Edge::Node(node) => match node.instance(traversal) {
                        Ok(value) => value,
                        Err(error) if dependency.is_optional() => {
                            tracing::warn!(
                                component = %implementation,
                                dependency = %dependency.api(),
                                %error,
                                "optional dependency not available"
                            );
                            Value::Absent
                        }
                        Err(error) => return Err(error),
                    },
                };
                values.push(value);
            }

            let mut arguments = Arguments::new(implementation.name(), dependencies, values);
            let raw = component.blueprint.construct(&mut arguments).map_err(|source| {
                ResolutionError::Instantiation {
                    component: implementation.name(),
                    path: traversal.instantiation_path(),
                    source: Box::new(source),
                }
            })?;
            tracing::debug!(component = %implementation, context = %component.injected, "instantiated");

            let handle = InstanceHandle::new(implementation);
            if let Some(observer) = traversal.observer() {
                observer.instantiated(&implementation, &component.injected, &handle);
            }
            if let Some(instance) = component.binding.info.cast(&implementation, &raw) {
                handle.fill(instance);
            }

            traversal.instantiated(&component.identity, &component.binding.info, &raw);
            Ok(raw)
        })
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            NodeKind::Constant(_) => "constant",
            NodeKind::Cached { .. } => "cached",
            NodeKind::Component(_) => "component",
            NodeKind::Produced(_) => "produced",
            NodeKind::Group(_) => "group",
            NodeKind::Cycle(_) => "cycle",
            NodeKind::Lazy { .. } => "lazy",
        };
        f.debug_struct("Node")
            .field("kind", &kind)
            .field("api", &self.api)
            .field("type", &self.implementation)
            .field("context", &self.context)
            .finish()
    }
}

//! Graph resolution over the container tree.

use std::sync::Arc;

use crate::context::{ComponentContext, ContextDefinition};
use crate::descriptors::{Blueprint, Dependency, DependencyKind};
use crate::error::{ResolutionError, ResolutionResult};
use crate::factory::{ComponentFactory, ComponentVariantFactory};
use crate::graph::{ComponentNode, DependencyGraph, Edge, Identity, Node, Slot, Traversal, Value};
use crate::instance::{AnyArc, Instance};
use crate::key::TypeRef;
use crate::observer::ComponentResolutionObserver;
use crate::registration::{Binding, BindingSource};
use crate::registry::Registry;

use super::{Container, ContainerInner};

impl ContainerInner {
    /// Resolves and instantiates `api` from the root of a new traversal.
    pub(crate) fn resolve_root(
        self: &Arc<Self>,
        api: TypeRef,
        definition: &ContextDefinition,
        observer: Option<Arc<dyn ComponentResolutionObserver>>,
    ) -> ResolutionResult<Option<Instance>> {
        let mut traversal = Traversal::new(self.settings(), observer);
        let node = match self.resolve_component(api, definition, &mut traversal)? {
            Some(node) => node,
            None => return Ok(None),
        };
        match node.instance(&mut traversal)? {
            Value::Instance(instance) => Ok(Some(instance)),
            Value::Slot(slot) => slot.get().map(Some),
            _ => Err(ResolutionError::TypeMismatch(api.name())),
        }
    }

    pub(crate) fn resolve_root_group(
        self: &Arc<Self>,
        api: TypeRef,
        definition: &ContextDefinition,
        observer: Option<Arc<dyn ComponentResolutionObserver>>,
    ) -> ResolutionResult<Vec<Instance>> {
        let mut traversal = Traversal::new(self.settings(), observer);
        let node = self.resolve_group(api, definition, &mut traversal)?;
        match node.instance(&mut traversal)? {
            Value::Group(members) => Ok(members),
            _ => Err(ResolutionError::TypeMismatch(api.name())),
        }
    }

    /// `api` in this container, then the parents, then the platform.
    pub(crate) fn resolve_component(
        self: &Arc<Self>,
        api: TypeRef,
        definition: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Option<Arc<Node>>> {
        if let Some(node) = self.resolve_local(api, definition, traversal)? {
            return Ok(Some(node));
        }
        if let Some(parent) = self.parent() {
            if let Some(node) = parent.resolve_component(api, definition, traversal)? {
                return Ok(Some(node));
            }
        }
        if let Some(platform) = self.registry.platform() {
            if let Some(instance) = platform.resolve(&api, &definition.create_defined())? {
                tracing::trace!(api = %api, "resolved by platform");
                return Ok(Some(Arc::new(Node::constant(api, api, instance))));
            }
        }
        Ok(None)
    }

    /// `api` among this container's own bindings.
    pub(crate) fn resolve_local(
        self: &Arc<Self>,
        api: TypeRef,
        definition: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Option<Arc<Node>>> {
        if api == TypeRef::of::<Container>() {
            let container = Container::injected(self, traversal.observer().cloned());
            let instance = Instance::new(Arc::new(container));
            return Ok(Some(Arc::new(Node::constant(api, api, instance))));
        }
        match self.registry.select(&api)? {
            Some(binding) => self.resolve_binding(&binding, api, definition, traversal).map(Some),
            None => Ok(None),
        }
    }

    /// Members of group `api`: the parents' first, then this container's in
    /// registration order.
    pub(crate) fn resolve_group(
        self: &Arc<Self>,
        api: TypeRef,
        definition: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Arc<Node>> {
        let mut members = match self.parent() {
            Some(parent) => parent.resolve_group(api, definition, traversal)?.members(),
            None => Vec::new(),
        };
        for binding in self.registry.members(&api) {
            let member = self.resolve_binding(&binding, api, definition, traversal)?;
            if member.is_cycle() {
                return Err(ResolutionError::Circular {
                    api: api.name(),
                    path: traversal.describe(),
                });
            }
            members.push(member);
        }

        let context = members
            .iter()
            .fold(ComponentContext::empty(), |context, member| context.union(member.context()));
        Ok(Arc::new(Node::group(api, context, members)))
    }

    fn resolve_binding(
        self: &Arc<Self>,
        binding: &Arc<Binding>,
        api: TypeRef,
        definition: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Arc<Node>> {
        match &binding.source {
            BindingSource::Instance(_) => {
                let instance = binding
                    .constant(&api)
                    .ok_or(ResolutionError::TypeMismatch(api.name()))?;
                Ok(Arc::new(Node::constant(api, binding.implementation, instance)))
            }
            BindingSource::Component(blueprint) => {
                self.resolve_constructed(binding, blueprint, api, definition, traversal)
            }
            BindingSource::Factory { factory, target } => {
                self.resolve_produced(binding, factory, target.as_ref(), api, definition, traversal)
            }
        }
    }

    /// Node for an implementation built from its dependencies.
    fn resolve_constructed(
        self: &Arc<Self>,
        binding: &Arc<Binding>,
        blueprint: &Blueprint,
        api: TypeRef,
        definition: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Arc<Node>> {
        let mut accepted = definition.accept(&binding.info);
        let identity = Identity {
            domain: self.domain,
            binding: binding.id,
            context: accepted.create(),
        };
        let implementation = binding.implementation;
        let defined = definition.create_defined();
        let cached = binding.lifetime().is_cached();

        if let Some(node) = traversal.memoized(&identity, api, &defined) {
            return Ok(node);
        }
        if cached {
            if let Some(node) = self.cached_node(binding, api, &defined) {
                return Ok(node);
            }
        }

        let key = identity.clone();
        let node = traversal.follow(identity.clone(), api, implementation, |traversal| {
            let dependencies = blueprint.dependencies();
            let mut edges = Vec::with_capacity(dependencies.len());
            let mut definitions = Vec::with_capacity(dependencies.len());

            for dependency in dependencies {
                let mut edge = accepted.copy();
                let annotations: Vec<_> = binding
                    .info
                    .defined()
                    .iter()
                    .chain(dependency.annotations())
                    .cloned()
                    .collect();
                edge.expand(&annotations, Some(dependency.api()));

                traversal.descend(&implementation, &dependency.api());
                let resolved = self.resolve_dependency(dependency, &edge, traversal);
                traversal.ascend(&implementation, &dependency.api());

                let resolved = match resolved {
                    Ok(resolved) => resolved,
                    Err(error) if dependency.is_optional() => {
                        tracing::warn!(
                            component = %implementation,
                            dependency = %dependency.api(),
                            %error,
                            "optional dependency not resolved"
                        );
                        Edge::Absent
                    }
                    Err(error) => return Err(error),
                };
                if let Edge::Node(node) = &resolved {
                    edge.consume(node.context());
                }
                edges.push(resolved);
                definitions.push(edge);
            }

            accepted.collect(&definitions);
            let context = accepted.create();
            let injected = context.narrow(binding.info.accepted());
            let cyclic = edges
                .iter()
                .any(|edge| matches!(edge, Edge::Node(node) if node.is_cyclic()));
            let settled = edges
                .iter()
                .all(|edge| !matches!(edge, Edge::Node(node) if !node.is_settled()));

            let component = ComponentNode {
                container: self.clone(),
                binding: binding.clone(),
                blueprint: blueprint.clone(),
                identity,
                edges,
                injected,
                cyclic,
                settled,
            };
            Ok(Arc::new(Node::component(api, context, component)))
        })?;

        if node.is_settled() {
            if cached {
                self.cache.remember(self.domain, binding.id, &defined, node.context());
            }
            traversal.memoize(key, api, defined, node.clone());
        }
        Ok(node)
    }

    /// Node for a cached component already instantiated under the active
    /// context `defined` narrowed to before.
    fn cached_node(&self, binding: &Binding, api: TypeRef, defined: &ComponentContext) -> Option<Arc<Node>> {
        let context = self.cache.active_context(self.domain, binding.id, defined)?;
        let raw = self.cache.peek(self.domain, binding.id, &context, &api)?;
        let instance = binding.cast(&api, &raw)?;
        tracing::trace!(api = %api, context = %context, "resolved from component cache");
        let injected = context.narrow(binding.info.accepted());
        Some(Arc::new(Node::cached(
            api,
            binding.implementation,
            context,
            injected,
            instance,
        )))
    }

    fn resolve_dependency(
        self: &Arc<Self>,
        dependency: &Dependency,
        definition: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Edge> {
        let api = dependency.api();
        match dependency.kind() {
            DependencyKind::Context => Ok(Edge::Context),
            DependencyKind::Group => self.resolve_group(api, definition, traversal).map(Edge::Node),
            DependencyKind::Component if dependency.is_deferred() => {
                Ok(Edge::Node(self.deferred(api, definition, traversal)))
            }
            DependencyKind::Component => match self.resolve_component(api, definition, traversal)? {
                Some(node) => Ok(Edge::Node(node)),
                None if dependency.is_optional() => Ok(Edge::Absent),
                None => Err(ResolutionError::Unresolved {
                    api: api.name(),
                    path: traversal.describe(),
                }),
            },
        }
    }

    /// Node for a dependency instantiated on first access.
    ///
    /// The target's graph is resolved now so the consumer is cached under
    /// the context the target will use. The slot holds the container weakly
    /// and resolves from a fresh traversal with the definition of the edge.
    fn deferred(
        self: &Arc<Self>,
        api: TypeRef,
        definition: &ContextDefinition,
        traversal: &Traversal,
    ) -> Arc<Node> {
        let (context, settled) = match traversal.deferred(api) {
            // the target's graph encloses this one: a deferred loop
            None => (ComponentContext::empty(), false),
            Some(mut nested) => match self.resolve_component(api, definition, &mut nested) {
                Ok(Some(target)) => (target.context().clone(), target.is_settled()),
                Ok(None) => (ComponentContext::empty(), true),
                Err(error) => {
                    tracing::debug!(api = %api, %error, "deferred dependency does not resolve");
                    (ComponentContext::empty(), true)
                }
            },
        };

        let container = Arc::downgrade(self);
        let observer = traversal.observer().cloned();
        let definition = definition.copy();
        let slot = Slot::deferred(api, move || {
            let container = container.upgrade().ok_or(ResolutionError::ContainerDropped)?;
            container
                .resolve_root(api, &definition, observer.clone())?
                .ok_or_else(|| ResolutionError::Unresolved {
                    api: api.name(),
                    path: api.name().to_string(),
                })
        });
        Arc::new(Node::lazy(api, context, settled, slot))
    }

    /// Node for a component a factory binds into its nested container.
    fn resolve_produced(
        self: &Arc<Self>,
        binding: &Arc<Binding>,
        factory: &Blueprint,
        target: Option<&Blueprint>,
        api: TypeRef,
        definition: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Arc<Node>> {
        let marker = match target {
            Some(_) => TypeRef::of::<dyn ComponentVariantFactory>(),
            None => TypeRef::of::<dyn ComponentFactory>(),
        };
        let factory_node = self.resolve_constructed(binding, factory, marker, definition, traversal)?;
        if factory_node.is_cycle() {
            return Err(ResolutionError::Circular {
                api: api.name(),
                path: traversal.describe(),
            });
        }

        let instance = match factory_node.instance(traversal)? {
            Value::Instance(instance) => instance,
            _ => return Err(ResolutionError::TypeMismatch(marker.name())),
        };
        let factory_context = factory_node.injected_context();

        let nested = self.factories.lookup(
            self.domain,
            binding.id,
            factory_node.context(),
            &api,
            || {
                let mut registry = Registry::with_settings(self.settings().clone());
                match target {
                    None => {
                        let factory = instance.expect::<dyn ComponentFactory>()?;
                        factory.new_component(&mut registry, &factory_context)?;
                    }
                    Some(target) => {
                        let factory = instance.expect::<dyn ComponentVariantFactory>()?;
                        factory.new_component(&mut registry, &factory_context)?;
                        registry.bind_blueprint(target.clone(), &[])?;
                    }
                }
                tracing::debug!(
                    factory = %binding.implementation,
                    context = %factory_context,
                    bindings = registry.len(),
                    "factory prepared nested container"
                );
                Ok(ContainerInner::nested(registry, self) as AnyArc)
            },
        )?;
        let nested = nested
            .downcast::<ContainerInner>()
            .map_err(|_| ResolutionError::TypeMismatch("nested container"))?;

        let produced = nested
            .resolve_local(api, definition, traversal)?
            .ok_or(ResolutionError::FactoryUnbound {
                factory: binding.implementation.name(),
                api: api.name(),
            })?;
        let context = factory_node.context().union(produced.context());
        Ok(Arc::new(Node::produced(api, context, produced)))
    }
}

impl DependencyGraph for Container {
    fn resolve_component(
        &self,
        api: TypeRef,
        context: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Option<Arc<Node>>> {
        self.inner()?.resolve_component(api, context, traversal)
    }

    fn resolve_group(
        &self,
        api: TypeRef,
        context: &ContextDefinition,
        traversal: &mut Traversal,
    ) -> ResolutionResult<Arc<Node>> {
        self.inner()?.resolve_group(api, context, traversal)
    }
}

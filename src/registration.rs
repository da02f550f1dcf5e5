//! Binding records and the binding table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptors::{Blueprint, ComponentDescriptor};
use crate::error::{BindingError, BindingResult, ResolutionError, ResolutionResult};
use crate::instance::{AnyArc, Instance};
use crate::key::TypeRef;
use crate::lifetime::Lifetime;
use crate::types::TypeInfo;

/// Binding precedence, lowest first.
///
/// Resolution picks the candidates with the highest precedence bound to an
/// interface; an explicit binding replaces default and fallback ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Used only when nothing else is bound
    Fallback,
    /// Replaced by any explicit binding
    Default,
    /// Unique per interface
    Explicit,
}

/// How a binding produces its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Constructed from its dependencies
    Component,
    /// Pre-built instance
    Instance,
    /// Produced by a [`ComponentFactory`](crate::ComponentFactory)
    Factory,
    /// Produced through a [`ComponentVariantFactory`](crate::ComponentVariantFactory)
    VariantFactory,
    /// Member of a component group only
    GroupMember,
}

pub(crate) enum Constant {
    /// The implementation itself; converted per interface through its casts
    Raw(AnyArc),
    /// An interface instance bound for its interface only
    Interface(Instance),
}

pub(crate) enum BindingSource {
    Component(Blueprint),
    Instance(Constant),
    Factory {
        factory: Blueprint,
        target: Option<Blueprint>,
    },
}

/// A bound implementation.
pub(crate) struct Binding {
    /// Unique within its registry; part of the cache key
    pub(crate) id: usize,
    pub(crate) implementation: TypeRef,
    pub(crate) info: TypeInfo,
    pub(crate) source: BindingSource,
    pub(crate) priority: Priority,
    pub(crate) apis: Vec<TypeRef>,
    pub(crate) groups: Vec<TypeRef>,
    pub(crate) member_only: bool,
}

impl Binding {
    pub(crate) fn lifetime(&self) -> Lifetime {
        self.info.lifetime()
    }

    /// Converts the raw implementation to `api`.
    pub(crate) fn cast(&self, api: &TypeRef, raw: &AnyArc) -> Option<Instance> {
        self.info.cast(api, raw)
    }

    /// The bound instance converted to `api`.
    pub(crate) fn constant(&self, api: &TypeRef) -> Option<Instance> {
        match &self.source {
            BindingSource::Instance(Constant::Raw(raw)) => self.cast(api, raw),
            BindingSource::Instance(Constant::Interface(instance)) if self.apis.contains(api) => {
                Some(instance.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> BindingKind {
        match &self.source {
            BindingSource::Instance(_) => BindingKind::Instance,
            BindingSource::Factory { target: None, .. } => BindingKind::Factory,
            BindingSource::Factory { target: Some(_), .. } => BindingKind::VariantFactory,
            BindingSource::Component(_) if self.member_only => BindingKind::GroupMember,
            BindingSource::Component(_) => BindingKind::Component,
        }
    }

    pub(crate) fn describe(&self) -> ComponentDescriptor {
        ComponentDescriptor {
            implementation: self.implementation,
            apis: self.apis.clone(),
            groups: self.groups.clone(),
            priority: self.priority,
            lifetime: self.lifetime(),
            kind: self.kind(),
        }
    }
}

/// Bindings of one registry, indexed by interface and by group.
#[derive(Default)]
pub(crate) struct BindingTable {
    bindings: Vec<Arc<Binding>>,
    components: HashMap<TypeRef, Vec<usize>>,
    groups: HashMap<TypeRef, Vec<usize>>,
}

impl BindingTable {
    pub(crate) fn next_id(&self) -> usize {
        self.bindings.len()
    }

    /// The explicit binding for `api`, if any.
    pub(crate) fn explicit(&self, api: &TypeRef) -> Option<&Arc<Binding>> {
        self.components
            .get(api)?
            .iter()
            .map(|&id| &self.bindings[id])
            .find(|binding| binding.priority == Priority::Explicit)
    }

    /// Whether `implementation` already is a member of `group`.
    pub(crate) fn is_member(&self, group: &TypeRef, implementation: &TypeRef) -> bool {
        self.groups.get(group).map_or(false, |members| {
            members
                .iter()
                .any(|&id| self.bindings[id].implementation == *implementation)
        })
    }

    /// Whether `implementation` is already bound to `api` with `priority`.
    fn is_bound(&self, api: &TypeRef, priority: Priority, implementation: &TypeRef) -> bool {
        self.components.get(api).map_or(false, |candidates| {
            candidates.iter().map(|&id| &self.bindings[id]).any(|existing| {
                existing.priority == priority && existing.implementation == *implementation
            })
        })
    }

    /// Adds a binding after checking it against the explicit bindings.
    ///
    /// Returns `false` when the same implementation is already bound with the
    /// same precedence; binding it again is a no-op.
    pub(crate) fn insert(&mut self, binding: Binding) -> BindingResult<bool> {
        for api in &binding.apis {
            if self.is_bound(api, binding.priority, &binding.implementation) {
                return Ok(false);
            }
        }
        if binding.priority == Priority::Explicit {
            for api in &binding.apis {
                if let Some(existing) = self.explicit(api) {
                    return Err(BindingError::Duplicate {
                        api: api.name(),
                        existing: existing.implementation.name(),
                    });
                }
            }
        }

        let id = self.bindings.len();
        debug_assert_eq!(id, binding.id);
        for api in &binding.apis {
            self.components.entry(*api).or_default().push(id);
        }
        for group in &binding.groups {
            self.groups.entry(*group).or_default().push(id);
        }
        self.bindings.push(Arc::new(binding));
        Ok(true)
    }

    /// The binding that resolves `api`.
    ///
    /// Fails when more than one candidate shares the highest precedence.
    pub(crate) fn select(&self, api: &TypeRef) -> ResolutionResult<Option<Arc<Binding>>> {
        let candidates = match self.components.get(api) {
            Some(candidates) if !candidates.is_empty() => candidates,
            _ => return Ok(None),
        };
        let best = candidates
            .iter()
            .map(|&id| self.bindings[id].priority)
            .max()
            .unwrap_or(Priority::Fallback);
        let winners: Vec<&Arc<Binding>> = candidates
            .iter()
            .map(|&id| &self.bindings[id])
            .filter(|binding| binding.priority == best)
            .collect();

        match winners.as_slice() {
            [only] => Ok(Some(Arc::clone(only))),
            _ => Err(ResolutionError::Ambiguous {
                api: api.name(),
                candidates: winners.iter().map(|binding| binding.implementation.name()).collect(),
            }),
        }
    }

    /// Members of `group`, in registration order.
    pub(crate) fn members(&self, group: &TypeRef) -> Vec<Arc<Binding>> {
        self.groups
            .get(group)
            .map(|members| members.iter().map(|&id| self.bindings[id].clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Binding>> {
        self.bindings.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }
}

//! Constructor arguments.

use std::sync::Arc;

use crate::context::ComponentContext;
use crate::descriptors::{Dependency, DependencyKind};
use crate::error::{ResolutionError, ResolutionResult};
use crate::graph::{Reference, Slot, Value};
use crate::key::{Reflect, TypeRef};

use super::Container;

/// Resolved dependencies handed to [`Component::construct`](crate::Component::construct).
///
/// Values are taken in the order the component declared its dependencies.
/// Each accessor checks that the next declared dependency has the requested
/// shape and interface, so a constructor that drifts out of sync with its
/// dependency list fails with [`ResolutionError::ArgumentMismatch`] instead
/// of receiving the wrong component.
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
/// struct Schema(&'static str);
/// impl ContextAnnotation for Schema {
///     const NAME: &'static str = "schema";
///     fn value(&self) -> String { self.0.to_string() }
/// }
///
/// struct Table { schema: String, label: Option<Arc<String>> }
/// impl Reflect for Table {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>().accepts::<Schema>().into()
///     }
/// }
/// impl Component for Table {
///     fn dependencies() -> Vec<Dependency> {
///         vec![Dependency::context(), Dependency::component::<String>().optional()]
///     }
///     fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
///         let context: ComponentContext = args.context()?;
///         Ok(Table {
///             schema: context.value("schema", "public"),
///             label: args.optional()?,
///         })
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.bind_component::<Table>().unwrap();
/// let container = registry.build();
///
/// let table = container.get_component_in::<Table>(&[Schema("audit").into()]).unwrap();
/// assert_eq!(table.schema, "audit");
/// assert!(table.label.is_none());
/// ```
pub struct Arguments<'a> {
    component: &'static str,
    dependencies: &'a [Dependency],
    values: std::vec::IntoIter<Value>,
    index: usize,
}

impl<'a> Arguments<'a> {
    pub(crate) fn new(component: &'static str, dependencies: &'a [Dependency], values: Vec<Value>) -> Self {
        Arguments {
            component,
            dependencies,
            values: values.into_iter(),
            index: 0,
        }
    }

    /// The next component dependency.
    ///
    /// On a circular dependency this is the interface's proxy; on a deferred
    /// one the component is resolved now.
    pub fn component<I: ?Sized + Reflect + Send + Sync>(&mut self) -> ResolutionResult<Arc<I>> {
        let api = TypeRef::of::<I>();
        match self.next(DependencyKind::Component, api, "a component")? {
            Value::Instance(instance) => instance.expect::<I>(),
            Value::Slot(slot) => from_slot(slot),
            Value::Absent => Err(ResolutionError::Unresolved {
                api: api.name(),
                path: self.component.to_string(),
            }),
            _ => Err(self.mismatch("a component")),
        }
    }

    /// The next component dependency, `None` when it was declared optional
    /// and could not be provided.
    pub fn optional<I: ?Sized + Reflect + Send + Sync>(&mut self) -> ResolutionResult<Option<Arc<I>>> {
        match self.next(DependencyKind::Component, TypeRef::of::<I>(), "a component")? {
            Value::Instance(instance) => instance.expect::<I>().map(Some),
            Value::Slot(slot) => from_slot(slot).map(Some),
            Value::Absent => Ok(None),
            _ => Err(self.mismatch("a component")),
        }
    }

    /// The next component dependency as a handle.
    ///
    /// Required for deferred dependencies and for the consumer side of a
    /// circular reference, where the component does not exist yet.
    pub fn reference<I: ?Sized + Reflect + Send + Sync>(&mut self) -> ResolutionResult<Reference<I>> {
        let api = TypeRef::of::<I>();
        match self.next(DependencyKind::Component, api, "a component")? {
            Value::Instance(instance) => Ok(Reference::new(Slot::ready(api, instance))),
            Value::Slot(slot) => Ok(Reference::new(slot)),
            Value::Absent => Err(ResolutionError::Unresolved {
                api: api.name(),
                path: self.component.to_string(),
            }),
            _ => Err(self.mismatch("a component")),
        }
    }

    /// The members of the next group dependency, parent members first.
    pub fn group<G: ?Sized + Reflect + Send + Sync>(&mut self) -> ResolutionResult<Vec<Arc<G>>> {
        match self.next(DependencyKind::Group, TypeRef::of::<G>(), "a group")? {
            Value::Group(members) => members.iter().map(|member| member.expect::<G>()).collect(),
            Value::Absent => Ok(Vec::new()),
            _ => Err(self.mismatch("a group")),
        }
    }

    /// The component's own context.
    pub fn context(&mut self) -> ResolutionResult<ComponentContext> {
        match self.next(DependencyKind::Context, TypeRef::of::<ComponentContext>(), "the context")? {
            Value::Context(context) => Ok(context),
            _ => Err(self.mismatch("the context")),
        }
    }

    /// The container the component is resolved in.
    pub fn container(&mut self) -> ResolutionResult<Container> {
        self.component::<Container>().map(|container| (*container).clone())
    }

    /// Number of arguments not taken yet.
    pub fn remaining(&self) -> usize {
        self.dependencies.len().saturating_sub(self.index)
    }

    fn next(&mut self, kind: DependencyKind, api: TypeRef, expected: &'static str) -> ResolutionResult<Value> {
        let declared = self
            .dependencies
            .get(self.index)
            .filter(|dependency| dependency.kind() == kind && dependency.api() == api);
        if declared.is_none() {
            return Err(self.mismatch(expected));
        }
        self.index += 1;
        self.values.next().ok_or_else(|| self.mismatch(expected))
    }

    fn mismatch(&self, expected: &'static str) -> ResolutionError {
        ResolutionError::ArgumentMismatch {
            component: self.component,
            index: self.index,
            expected,
        }
    }
}

fn from_slot<I: ?Sized + Send + Sync + 'static>(slot: Arc<Slot>) -> ResolutionResult<Arc<I>> {
    match slot.stand_in() {
        Some(proxy) => proxy.expect::<I>(),
        None => Reference::<I>::new(slot).get(),
    }
}

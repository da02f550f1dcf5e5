//! Foreign component sources.

use std::sync::Arc;

use crate::context::{ComponentContext, ContextDefinition};
use crate::error::ResolutionResult;
use crate::instance::Instance;
use crate::key::TypeRef;

use super::Container;

/// A read-only source of components outside the container tree.
///
/// Consulted for interfaces that no container in the tree binds, after the
/// parents. Instances returned from here are used as they are; they are not
/// cached or instantiated by the container.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{
///     ComponentContext, Instance, PlatformContainer, Registry, ResolutionResult, TypeRef,
/// };
/// use std::sync::Arc;
///
/// struct Environment;
///
/// impl PlatformContainer for Environment {
///     fn resolve(&self, api: &TypeRef, _: &ComponentContext) -> ResolutionResult<Option<Instance>> {
///         if *api == TypeRef::of::<String>() {
///             return Ok(Some(Instance::new(Arc::new("production".to_string()))));
///         }
///         Ok(None)
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.with_platform(Arc::new(Environment));
/// let container = registry.build();
///
/// assert_eq!(*container.get_component::<String>().unwrap(), "production");
/// assert!(container.try_get_component::<u32>().unwrap().is_none());
/// ```
pub trait PlatformContainer: Send + Sync {
    /// The instance for `api`, converted to `api`, or `None` when this
    /// source does not provide it.
    fn resolve(&self, api: &TypeRef, context: &ComponentContext) -> ResolutionResult<Option<Instance>>;
}

/// Another container tree used as the platform.
impl PlatformContainer for Container {
    fn resolve(&self, api: &TypeRef, context: &ComponentContext) -> ResolutionResult<Option<Instance>> {
        let annotations: Vec<_> = context
            .entries()
            .values()
            .flat_map(|values| values.iter().cloned())
            .collect();
        let mut definition = ContextDefinition::new();
        definition.expand(&annotations, Some(*api));
        self.resolve_instance(*api, &definition)
    }
}

impl<P: PlatformContainer + ?Sized> PlatformContainer for Arc<P> {
    fn resolve(&self, api: &TypeRef, context: &ComponentContext) -> ResolutionResult<Option<Instance>> {
        (**self).resolve(api, context)
    }
}

//! Component factories.
//!
//! A factory is bound in place of the components it produces. When one of
//! its interfaces is resolved, the container instantiates the factory, hands
//! it a nested [`Registry`] and resolves the interface in the nested
//! container built from it. Nested containers are cached per factory and
//! factory context, so a factory runs once for each distinct context it
//! accepts.

use crate::context::ComponentContext;
use crate::error::ResolutionResult;
use crate::key::Reflect;
use crate::registry::Registry;
use crate::types::TypeInfo;

/// Produces the implementation of its component interfaces.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{
///     Component, ComponentContext, ComponentFactory, ComponentSpec, Arguments,
///     Reflect, Registry, ResolutionResult, TypeInfo, TypeRef,
/// };
/// use std::sync::Arc;
///
/// trait Greeting: Send + Sync {
///     fn text(&self) -> String;
/// }
/// impl Reflect for dyn Greeting {
///     fn type_info() -> TypeInfo { TypeInfo::interface::<Self>() }
/// }
///
/// struct Hello;
/// impl Greeting for Hello {
///     fn text(&self) -> String { "hello".into() }
/// }
/// impl Reflect for Hello {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>().implements::<dyn Greeting>(|it| it).into()
///     }
/// }
/// impl Component for Hello {
///     fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> { Ok(Hello) }
/// }
///
/// struct GreetingFactory;
/// impl ComponentFactory for GreetingFactory {
///     fn new_component(&self, registry: &mut Registry, _: &ComponentContext) -> ResolutionResult<()> {
///         registry.bind_component::<Hello>()?;
///         Ok(())
///     }
/// }
/// impl Reflect for GreetingFactory {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>()
///             .implements::<dyn ComponentFactory>(|it| it)
///             .component(ComponentSpec::new().api::<dyn Greeting>())
///             .into()
///     }
/// }
/// impl Component for GreetingFactory {
///     fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> { Ok(GreetingFactory) }
/// }
///
/// let mut registry = Registry::new();
/// registry.bind_factory::<GreetingFactory>(&[]).unwrap();
/// let container = registry.build();
/// assert_eq!(container.get_component::<dyn Greeting>().unwrap().text(), "hello");
/// ```
pub trait ComponentFactory: Send + Sync {
    /// Binds the produced implementation (and anything it needs) into the
    /// nested registry.
    fn new_component(&self, registry: &mut Registry, context: &ComponentContext)
        -> ResolutionResult<()>;
}

/// Customizes the instantiation of an existing implementation.
///
/// The factory binds additional components into the nested registry; the
/// target implementation it was bound with is then bound there too, so its
/// dependencies see the factory's bindings first.
pub trait ComponentVariantFactory: Send + Sync {
    fn new_component(&self, registry: &mut Registry, context: &ComponentContext)
        -> ResolutionResult<()>;
}

impl Reflect for dyn ComponentFactory {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>()
    }
}

impl Reflect for dyn ComponentVariantFactory {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>()
    }
}

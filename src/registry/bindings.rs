//! Reusable sets of bindings.

use crate::error::BindingResult;

use super::Registry;

/// A set of bindings that can be installed into a [`Registry`].
///
/// Bindings are installed by reference so the same set can populate several
/// registries, e.g. every child container made with
/// [`Container::make_child`](crate::Container::make_child). Closures taking
/// `&mut Registry` are bindings too.
///
/// # Example
///
/// ```rust
/// use fluid_tools::{Bindings, BindingResult, Reflect, Registry, TypeInfo, TypeRef};
///
/// struct Threshold(u32);
/// impl Reflect for Threshold {
///     fn type_info() -> TypeInfo { TypeInfo::final_class::<Self>().into() }
/// }
///
/// struct AlertingBindings;
///
/// impl Bindings for AlertingBindings {
///     fn bind(&self, registry: &mut Registry) -> BindingResult<()> {
///         registry.bind_instance(Threshold(90))?;
///         Ok(())
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.install(&AlertingBindings).unwrap();
/// registry
///     .install(&|registry: &mut Registry| -> BindingResult<()> {
///         registry.bind_instance("alerts".to_string())?;
///         Ok(())
///     })
///     .unwrap();
///
/// let container = registry.build();
/// assert_eq!(container.get_component::<Threshold>().unwrap().0, 90);
/// assert_eq!(*container.get_component::<String>().unwrap(), "alerts");
/// ```
pub trait Bindings {
    /// Adds this set's bindings to `registry`.
    fn bind(&self, registry: &mut Registry) -> BindingResult<()>;
}

impl<F> Bindings for F
where
    F: Fn(&mut Registry) -> BindingResult<()>,
{
    fn bind(&self, registry: &mut Registry) -> BindingResult<()> {
        self(registry)
    }
}

/// No bindings at all.
pub struct NoBindings;

impl Bindings for NoBindings {
    fn bind(&self, _: &mut Registry) -> BindingResult<()> {
        Ok(())
    }
}

impl Registry {
    /// Installs a set of bindings.
    pub fn install<B: Bindings + ?Sized>(&mut self, bindings: &B) -> BindingResult<&mut Self> {
        bindings.bind(self)?;
        Ok(self)
    }

    /// Installs a set of bindings, consuming and returning the registry.
    ///
    /// ```rust
    /// use fluid_tools::{BindingResult, Registry};
    ///
    /// fn numbers(registry: &mut Registry) -> BindingResult<()> {
    ///     registry.bind_instance(7u32)?;
    ///     Ok(())
    /// }
    ///
    /// let container = Registry::new().with(&numbers).unwrap().build();
    /// assert_eq!(*container.get_component::<u32>().unwrap(), 7);
    /// ```
    pub fn with<B: Bindings + ?Sized>(mut self, bindings: &B) -> BindingResult<Self> {
        bindings.bind(&mut self)?;
        Ok(self)
    }
}

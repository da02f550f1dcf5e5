//! Type-erased component instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{ResolutionError, ResolutionResult};

/// Type-erased `Arc` holding a constructed implementation.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// A component instance as seen through one of its interfaces.
///
/// Holds an `Arc<I>` behind `dyn Any`, the same `Arc<Arc<dyn Trait>>`
/// storage pattern used for trait objects everywhere in the container.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::Instance;
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct Fixed;
/// impl Clock for Fixed {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// let instance = Instance::new::<dyn Clock>(Arc::new(Fixed));
/// let clock = instance.downcast::<dyn Clock>().unwrap();
/// assert_eq!(clock.now(), 42);
/// assert!(instance.downcast::<String>().is_none());
/// ```
#[derive(Clone)]
pub struct Instance {
    inner: AnyArc,
    type_name: &'static str,
}

impl Instance {
    pub fn new<I: ?Sized + Send + Sync + 'static>(value: Arc<I>) -> Self {
        Instance {
            inner: Arc::new(value),
            type_name: std::any::type_name::<I>(),
        }
    }

    /// The `Arc<I>` held by this instance, if it was created for `I`.
    pub fn downcast<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.inner.downcast_ref::<Arc<I>>().cloned()
    }

    pub(crate) fn expect<I: ?Sized + Send + Sync + 'static>(&self) -> ResolutionResult<Arc<I>> {
        self.downcast::<I>()
            .ok_or(ResolutionError::TypeMismatch(std::any::type_name::<I>()))
    }

    /// Name of the interface the instance was created for.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_name)
    }
}

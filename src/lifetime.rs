//! Component lifetime definitions.

/// Component lifetimes controlling instance caching behavior
///
/// Cached components are instantiated at most once per distinct active
/// context in their container, stateful components on every resolution.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{ComponentSpec, Lifetime};
///
/// let spec = ComponentSpec::new().stateful();
/// assert_eq!(spec.lifetime(), Lifetime::Stateful);
/// assert!(!spec.lifetime().is_cached());
/// assert_eq!(ComponentSpec::new().lifetime(), Lifetime::Cached);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// One instance per container and active context
    ///
    /// The instance is created when first requested and shared by every
    /// later resolution that arrives with the same active context, across
    /// threads and across all interfaces the component is bound to.
    #[default]
    Cached,
    /// New instance per resolution, never cached
    ///
    /// Use for components that keep per-consumer state.
    Stateful,
}

impl Lifetime {
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Cached)
    }
}

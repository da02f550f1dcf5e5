//! Error types for the dependency injection container.
//!
//! Two kinds of failure exist and they never mix: [`BindingError`] reports
//! static misconfiguration found while binding (or while a factory binds into
//! a nested registry), [`ResolutionError`] reports failures while resolving or
//! instantiating components.

use std::sync::Arc;

/// Static configuration errors.
///
/// Raised by the registry at bind time and by the interface inspector. They
/// are never retried: the binder is expected to fix its bindings.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::BindingError;
///
/// let error = BindingError::FactoryWithoutApi("app::Factory");
/// assert_eq!(
///     error.to_string(),
///     "factory app::Factory must list the component interfaces it provides"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// A factory class without an explicit component interface list
    #[error("factory {0} must list the component interfaces it provides")]
    FactoryWithoutApi(&'static str),
    /// A declared interface the implementation cannot be assigned to
    #[error("{implementation} is not assignable to {api}")]
    NotAssignable {
        api: &'static str,
        implementation: &'static str,
    },
    /// A declared interface that is itself an automatically bound component
    #[error("{api} referenced by {implementation} is an automatically bound component")]
    AutomaticApi {
        api: &'static str,
        implementation: &'static str,
    },
    /// A declared interface that is an abstract automatically bound component
    #[error("{api} referenced by {implementation} is an abstract automatically bound component")]
    AbstractAutomaticApi {
        api: &'static str,
        implementation: &'static str,
    },
    /// The factory marker interface used as a component interface
    #[error("{0} cannot be used as a component interface")]
    FactoryInterface(&'static str),
    /// The implementation offers no conversion to one of its interfaces
    #[error("{implementation} declares no conversion to {api}")]
    NotConvertible {
        api: &'static str,
        implementation: &'static str,
    },
    /// Second explicit binding for the same interface
    #[error("component mapping for {api} already exists: {existing}")]
    Duplicate {
        api: &'static str,
        existing: &'static str,
    },
    /// Same implementation listed twice as a service provider of an interface
    #[error("duplicate service provider {implementation} for {api}")]
    DuplicateProvider {
        api: &'static str,
        implementation: &'static str,
    },
    /// Variant factory bound without the implementation it customizes
    #[error("variant factory {0} must be bound together with its target implementation")]
    VariantWithoutTarget(&'static str),
    /// Group member that cannot be instantiated
    #[error("component group {group} cannot contain {member}: {reason}")]
    InvalidGroupMember {
        group: &'static str,
        member: &'static str,
        reason: &'static str,
    },
    /// Child requested through an injected handle after its container was dropped
    #[error("container has been dropped")]
    ContainerDropped,
}

/// Runtime resolution errors.
///
/// Propagated to the caller of `get_component`. Optional dependencies turn
/// any of these into an absent value at their own injection site.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::ResolutionError;
///
/// let error = ResolutionError::Circular {
///     api: "app::Engine",
///     path: "app::Car -> app::Engine -> app::Car".to_string(),
/// };
/// assert!(error.to_string().contains("app::Car -> app::Engine -> app::Car"));
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolutionError {
    /// Mandatory dependency with no binding anywhere
    #[error("no component bound to {api} (path: {path})")]
    Unresolved { api: &'static str, path: String },
    /// Circular dependency through a non-interface type
    #[error("circular dependency on {api}: {path}")]
    Circular { api: &'static str, path: String },
    /// More than one candidate at the winning binding precedence
    #[error("ambiguous binding for {api}: {}", candidates.join(", "))]
    Ambiguous {
        api: &'static str,
        candidates: Vec<&'static str>,
    },
    /// Constructor or factory failure, with the dependency path at the failure
    #[error("failed to instantiate {component} (path: {path}): {source}")]
    Instantiation {
        component: &'static str,
        path: String,
        #[source]
        source: Box<ResolutionError>,
    },
    /// Arbitrary failure raised by a component constructor
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync>),
    /// Constructor asked for an argument in a different shape than declared
    #[error("argument {index} of {component} is not {expected}")]
    ArgumentMismatch {
        component: &'static str,
        index: usize,
        expected: &'static str,
    },
    /// A circular reference used before its target finished instantiating
    #[error("circular reference to {0} accessed before the component was instantiated")]
    PrematureAccess(&'static str),
    /// A factory that did not bind the interface it was asked for
    #[error("factory {factory} did not bind {api}")]
    FactoryUnbound {
        factory: &'static str,
        api: &'static str,
    },
    /// Type downcast failed
    #[error("type mismatch for {0}")]
    TypeMismatch(&'static str),
    /// Maximum resolution depth exceeded
    #[error("max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Injected container handle used after the container was dropped
    #[error("container has been dropped")]
    ContainerDropped,
    /// Binding failure inside a factory's nested registry
    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl ResolutionError {
    /// Wraps an arbitrary error raised by a component constructor.
    ///
    /// ```rust
    /// use fluid_tools::ResolutionError;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
    /// let error = ResolutionError::failed(io);
    /// assert_eq!(error.to_string(), "disk gone");
    /// ```
    pub fn failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ResolutionError::Failed(Arc::new(error))
    }

    /// Failure with a plain message.
    pub fn message(message: impl Into<String>) -> Self {
        ResolutionError::Failed(Arc::new(Message(message.into())))
    }

    /// The innermost error, skipping instantiation wrappers.
    pub fn root_cause(&self) -> &ResolutionError {
        match self {
            ResolutionError::Instantiation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[derive(Debug)]
struct Message(String);

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// Container settings that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed JSON settings document
    #[error("invalid container settings: {0}")]
    Json(#[from] serde_json::Error),
    /// Environment variable with a value of the wrong shape
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

/// Result of binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

/// Result of resolution operations.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

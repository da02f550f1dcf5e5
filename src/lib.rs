//! # fluid-tools
//!
//! Context-aware dependency injection for Rust.
//!
//! ## Features
//!
//! - **Interface inference**: components bind to the interfaces their type
//!   metadata declares, following superclasses and component groups
//! - **Context annotations**: dependencies carry small annotation values
//!   that configure the components below them; components see only what
//!   they accept
//! - **Context-keyed caching**: one instance per container and distinct
//!   accepted context, shared across threads; repeated requests skip the
//!   dependency graph
//! - **Circular references**: cycles through an interface are broken with
//!   the proxy the interface registers, cycles through a concrete type or
//!   an interface without a proxy are reported with their path
//! - **Factories and groups**: factories bind the real implementation into
//!   a nested container; groups collect every member of an interface
//! - **Container trees**: children override their parents' bindings
//!   without affecting them
//!
//! ## Quick Start
//!
//! ```rust
//! use fluid_tools::{Arguments, Component, Dependency, Reflect, Registry, ResolutionResult, TypeInfo};
//! use std::sync::Arc;
//!
//! trait Storage: Send + Sync {
//!     fn name(&self) -> &str;
//! }
//! impl Reflect for dyn Storage {
//!     fn type_info() -> TypeInfo { TypeInfo::interface::<Self>() }
//! }
//!
//! struct MemoryStorage;
//! impl Storage for MemoryStorage {
//!     fn name(&self) -> &str { "memory" }
//! }
//! impl Reflect for MemoryStorage {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::class::<Self>().implements::<dyn Storage>(|it| it).into()
//!     }
//! }
//! impl Component for MemoryStorage {
//!     fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> { Ok(MemoryStorage) }
//! }
//!
//! struct UserService {
//!     storage: Arc<dyn Storage>,
//! }
//! impl Reflect for UserService {
//!     fn type_info() -> TypeInfo { TypeInfo::class::<Self>().into() }
//! }
//! impl Component for UserService {
//!     fn dependencies() -> Vec<Dependency> {
//!         vec![Dependency::component::<dyn Storage>()]
//!     }
//!     fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
//!         Ok(UserService { storage: args.component()? })
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.bind_component::<MemoryStorage>().unwrap();
//! registry.bind_component::<UserService>().unwrap();
//!
//! let container = registry.build();
//! let users = container.get_component::<UserService>().unwrap();
//! assert_eq!(users.storage.name(), "memory");
//! ```
//!
//! ## Lifetimes
//!
//! - **Cached**: one instance per container and active context (default)
//! - **Stateful**: a new instance on every resolution
//!
//! ## Child Containers
//!
//! ```rust
//! use fluid_tools::{BindingResult, Registry};
//!
//! let mut registry = Registry::new();
//! registry.bind_instance(1u32).unwrap();
//! let parent = registry.build();
//!
//! let child = parent
//!     .make_child(&|registry: &mut Registry| -> BindingResult<()> {
//!         registry.bind_instance(2u32)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(*parent.get_component::<u32>().unwrap(), 1);
//! assert_eq!(*child.get_component::<u32>().unwrap(), 2);
//! ```

// Module declarations
pub mod annotation;
pub mod cache;
pub mod config;
pub mod container;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod factory;
pub mod graph;
pub mod inspect;
pub mod instance;
pub mod key;
pub mod lifetime;
pub mod manifest;
pub mod observer;
pub mod registry;
pub mod termination;
pub mod types;

// Internal modules
mod registration;

// Re-export core types
pub use annotation::{AnnotationInstance, AnnotationKey, ComponentReference, Composition, ContextAnnotation};
pub use cache::ComponentCache;
pub use config::ContainerSettings;
pub use container::{Arguments, Container, PlatformContainer};
pub use context::{ComponentContext, ContextDefinition};
pub use descriptors::{Blueprint, Component, ComponentDescriptor, Dependency, DependencyKind};
pub use error::{BindingError, BindingResult, ConfigError, ResolutionError, ResolutionResult};
pub use factory::{ComponentFactory, ComponentVariantFactory};
pub use graph::{DependencyGraph, InstanceHandle, Node, PathEntry, Reference, Traversal};
pub use inspect::{inspect, Interfaces, Specification};
pub use instance::{AnyArc, Instance};
pub use key::{type_ref, Reflect, TypeRef};
pub use lifetime::Lifetime;
pub use manifest::ServiceProviders;
pub use observer::{observed, CompositeObserver, ComponentResolutionObserver, TracingObserver};
pub use registration::{BindingKind, Priority};
pub use registry::{Bindings, NoBindings, Registry};
pub use termination::ContainerTermination;
pub use types::{ClassInfo, ComponentSpec, GroupSpec, TypeInfo, TypeKind};

#[cfg(feature = "diagnostics")]
impl Registry {
    /// Human readable dump of every binding.
    pub fn to_debug_string(&self) -> String {
        let mut out = String::new();
        for descriptor in self.descriptors() {
            out.push_str(&format!(
                "{} [{:?}, {:?}, {:?}] -> {:?}",
                descriptor.implementation, descriptor.kind, descriptor.priority, descriptor.lifetime, descriptor.apis
            ));
            if !descriptor.groups.is_empty() {
                out.push_str(&format!(" groups {:?}", descriptor.groups));
            }
            out.push('\n');
        }
        out
    }
}

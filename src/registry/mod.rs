//! Binding registry.
//!
//! The registry is the mutable, single-threaded side of the container: all
//! bindings are made here, then [`Registry::build`] freezes them into a
//! [`Container`] that resolves concurrently.

mod bindings;

pub use bindings::{Bindings, NoBindings};

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ContainerSettings;
use crate::container::{Container, PlatformContainer};
use crate::descriptors::{Blueprint, Component, ComponentDescriptor};
use crate::error::{BindingError, BindingResult, ResolutionResult};
use crate::factory::{ComponentFactory, ComponentVariantFactory};
use crate::inspect::{inspect, Interfaces};
use crate::instance::Instance;
use crate::key::{Reflect, TypeRef};
use crate::observer::ComponentResolutionObserver;
use crate::registration::{Binding, BindingSource, BindingTable, Constant, Priority};
use crate::types::TypeInfo;

/// Collects bindings and builds containers.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{Arguments, Component, Reflect, Registry, ResolutionResult, TypeInfo};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
/// impl Reflect for dyn Clock {
///     fn type_info() -> TypeInfo { TypeInfo::interface::<Self>() }
/// }
///
/// struct SystemClock;
/// impl Clock for SystemClock {
///     fn now(&self) -> u64 { 1 }
/// }
/// impl Reflect for SystemClock {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>().implements::<dyn Clock>(|it| it).into()
///     }
/// }
/// impl Component for SystemClock {
///     fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> { Ok(SystemClock) }
/// }
///
/// let mut registry = Registry::new();
/// registry.bind_component::<SystemClock>().unwrap();
///
/// let container = registry.build();
/// let clock = container.get_component::<dyn Clock>().unwrap();
/// assert_eq!(clock.now(), 1);
///
/// // The same instance serves every interface of the implementation
/// let again = container.get_component::<dyn Clock>().unwrap();
/// assert!(Arc::ptr_eq(&clock, &again));
/// ```
pub struct Registry {
    settings: ContainerSettings,
    table: BindingTable,
    interfaces: HashMap<TypeRef, Interfaces>,
    observers: Vec<Arc<dyn ComponentResolutionObserver>>,
    platform: Option<Arc<dyn PlatformContainer>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_settings(ContainerSettings::default())
    }

    pub fn with_settings(settings: ContainerSettings) -> Self {
        Registry {
            settings,
            table: BindingTable::default(),
            interfaces: HashMap::new(),
            observers: Vec::new(),
            platform: None,
        }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Binds `T` to the interfaces the inspector finds for it.
    pub fn bind_component<T: Component>(&mut self) -> BindingResult<&mut Self> {
        self.bind_blueprint(Blueprint::of::<T>(), &[])
    }

    /// Binds `T` to `I` only.
    pub fn bind_component_as<I, T>(&mut self) -> BindingResult<&mut Self>
    where
        I: ?Sized + Reflect,
        T: Component,
    {
        self.bind_blueprint(Blueprint::of::<T>(), &[TypeRef::of::<I>()])
    }

    /// Binds `T` so that any explicit binding of the same interface replaces
    /// it.
    pub fn bind_default<T: Component>(&mut self) -> BindingResult<&mut Self> {
        self.bind_constructed(Blueprint::of::<T>(), &[], Priority::Default)
    }

    /// Binds a blueprint explicitly, restricted to `apis` when not empty.
    ///
    /// Factory blueprints are bound as factories.
    pub fn bind_blueprint(&mut self, blueprint: Blueprint, apis: &[TypeRef]) -> BindingResult<&mut Self> {
        self.bind_constructed(blueprint, apis, Priority::Explicit)
    }

    /// Binds a pre-built instance to the interfaces of its type.
    pub fn bind_instance<T: Reflect + Send + Sync>(&mut self, value: T) -> BindingResult<&mut Self> {
        let info = T::type_info();
        let interfaces = self.interfaces_of(&info, &[])?;
        let apis: Vec<TypeRef> = interfaces.apis().collect();
        let groups = interfaces.groups();
        check_casts(&info, apis.iter().chain(&groups))?;

        let binding = Binding {
            id: self.table.next_id(),
            implementation: TypeRef::of::<T>(),
            priority: priority_of(&info, Priority::Explicit),
            info,
            source: BindingSource::Instance(Constant::Raw(Arc::new(value))),
            apis,
            groups,
            member_only: false,
        };
        self.insert(binding)
    }

    /// Binds a pre-built instance to interface `I` only.
    pub fn bind_instance_as<I>(&mut self, value: Arc<I>) -> BindingResult<&mut Self>
    where
        I: ?Sized + Reflect + Send + Sync,
    {
        let api = TypeRef::of::<I>();
        let binding = Binding {
            id: self.table.next_id(),
            implementation: api,
            info: I::type_info(),
            source: BindingSource::Instance(Constant::Interface(Instance::new(value))),
            priority: Priority::Explicit,
            apis: vec![api],
            groups: Vec::new(),
            member_only: false,
        };
        self.insert(binding)
    }

    /// Binds factory `F` in place of the components it produces.
    ///
    /// The produced interfaces are the ones `F` declares in its component
    /// settings, restricted to `apis` when not empty.
    pub fn bind_factory<F: Component>(&mut self, apis: &[TypeRef]) -> BindingResult<&mut Self> {
        let info = F::type_info();
        let marker = TypeRef::of::<dyn ComponentFactory>();
        if !info.is_assignable_to(&marker) {
            return Err(BindingError::NotAssignable {
                api: marker.name(),
                implementation: TypeRef::of::<F>().name(),
            });
        }
        self.bind_factory_blueprint(Blueprint::of::<F>(), info, None, apis)
    }

    /// Binds `T` so that it is instantiated in a nested container prepared
    /// by variant factory `F`.
    pub fn bind_variant_factory<F: Component, T: Component>(&mut self) -> BindingResult<&mut Self> {
        let info = F::type_info();
        let marker = TypeRef::of::<dyn ComponentVariantFactory>();
        if !info.is_assignable_to(&marker) {
            return Err(BindingError::NotAssignable {
                api: marker.name(),
                implementation: TypeRef::of::<F>().name(),
            });
        }
        self.bind_factory_blueprint(Blueprint::of::<F>(), info, Some(Blueprint::of::<T>()), &[])
    }

    /// Adds members to component group `G`.
    ///
    /// Members are instantiated for the group only; they are not bound to
    /// their own interfaces. An implementation already in the group is
    /// skipped.
    pub fn bind_component_group<G: ?Sized + Reflect>(&mut self, members: &[Blueprint]) -> BindingResult<&mut Self> {
        let group = TypeRef::of::<G>();
        for member in members {
            let info = member.implementation().info();
            let reason = if info.is_interface() {
                Some("interfaces cannot be instantiated")
            } else if info.is_factory() {
                Some("factories cannot be group members")
            } else if !info.can_cast(&group) {
                Some("it declares no conversion to the group interface")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(BindingError::InvalidGroupMember {
                    group: group.name(),
                    member: member.implementation().name(),
                    reason,
                });
            }
        }

        for member in members {
            if self.table.is_member(&group, &member.implementation()) {
                continue;
            }
            let info = member.implementation().info();
            let binding = Binding {
                id: self.table.next_id(),
                implementation: member.implementation(),
                priority: Priority::Explicit,
                info,
                source: BindingSource::Component(member.clone()),
                apis: Vec::new(),
                groups: vec![group],
                member_only: true,
            };
            self.insert(binding)?;
        }
        Ok(self)
    }

    /// Observer notified by every container built from this registry.
    pub fn add_observer(&mut self, observer: Arc<dyn ComponentResolutionObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// Resolver consulted for interfaces bound nowhere in the container
    /// tree.
    pub fn with_platform(&mut self, platform: Arc<dyn PlatformContainer>) -> &mut Self {
        self.platform = Some(platform);
        self
    }

    /// The interfaces `info` binds to, as found by the inspector.
    ///
    /// Results without restrictions are cached per implementation.
    pub fn interfaces_of(&mut self, info: &TypeInfo, restrictions: &[TypeRef]) -> BindingResult<Interfaces> {
        if !restrictions.is_empty() {
            return inspect(info, restrictions);
        }
        if let Some(found) = self.interfaces.get(&info.this()) {
            return Ok(found.clone());
        }
        let found = inspect(info, &[])?;
        self.interfaces.insert(info.this(), found.clone());
        Ok(found)
    }

    /// Every binding, in registration order.
    pub fn descriptors(&self) -> Vec<ComponentDescriptor> {
        self.table.iter().map(|binding| binding.describe()).collect()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Freezes the bindings into a root container.
    pub fn build(self) -> Container {
        Container::root(self)
    }

    pub(crate) fn select(&self, api: &TypeRef) -> ResolutionResult<Option<Arc<Binding>>> {
        self.table.select(api)
    }

    pub(crate) fn members(&self, group: &TypeRef) -> Vec<Arc<Binding>> {
        self.table.members(group)
    }

    pub(crate) fn observers(&self) -> &[Arc<dyn ComponentResolutionObserver>] {
        &self.observers
    }

    pub(crate) fn platform(&self) -> Option<&Arc<dyn PlatformContainer>> {
        self.platform.as_ref()
    }

    fn bind_constructed(
        &mut self,
        blueprint: Blueprint,
        restrictions: &[TypeRef],
        priority: Priority,
    ) -> BindingResult<&mut Self> {
        let info = blueprint.implementation().info();
        if info.is_factory() {
            if info.is_assignable_to(&TypeRef::of::<dyn ComponentFactory>()) {
                return self.bind_factory_blueprint(blueprint, info, None, restrictions);
            }
            return Err(BindingError::VariantWithoutTarget(blueprint.implementation().name()));
        }

        let interfaces = self.interfaces_of(&info, restrictions)?;
        let apis: Vec<TypeRef> = interfaces.apis().collect();
        let groups = interfaces.groups();
        check_casts(&info, apis.iter().chain(&groups))?;

        let binding = Binding {
            id: self.table.next_id(),
            implementation: blueprint.implementation(),
            priority: priority_of(&info, priority),
            info,
            source: BindingSource::Component(blueprint),
            apis,
            groups,
            member_only: false,
        };
        self.insert(binding)
    }

    fn bind_factory_blueprint(
        &mut self,
        factory: Blueprint,
        info: TypeInfo,
        target: Option<Blueprint>,
        restrictions: &[TypeRef],
    ) -> BindingResult<&mut Self> {
        let marker = match target {
            Some(_) => TypeRef::of::<dyn ComponentVariantFactory>(),
            None => TypeRef::of::<dyn ComponentFactory>(),
        };
        check_casts(&info, [&marker])?;

        let interfaces = match &target {
            Some(target) => {
                let target_info = target.implementation().info();
                let interfaces = self.interfaces_of(&target_info, restrictions)?;
                let groups = interfaces.groups();
                check_casts(&target_info, interfaces.apis().collect::<Vec<_>>().iter().chain(&groups))?;
                interfaces
            }
            None => self.interfaces_of(&info, restrictions)?,
        };

        let binding = Binding {
            id: self.table.next_id(),
            implementation: factory.implementation(),
            priority: priority_of(&info, Priority::Explicit),
            info,
            apis: interfaces.apis().collect(),
            groups: interfaces.groups(),
            source: BindingSource::Factory { factory, target },
            member_only: false,
        };
        self.insert(binding)
    }

    fn insert(&mut self, binding: Binding) -> BindingResult<&mut Self> {
        let implementation = binding.implementation;
        let kind = binding.kind();
        let priority = binding.priority;
        let apis = binding.apis.clone();
        let groups = binding.groups.clone();

        if self.table.insert(binding)? {
            tracing::debug!(
                implementation = %implementation,
                ?kind,
                ?priority,
                ?apis,
                ?groups,
                "bound component"
            );
        } else {
            tracing::debug!(implementation = %implementation, "component already bound");
        }
        Ok(self)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn priority_of(info: &TypeInfo, requested: Priority) -> Priority {
    match info.component_spec() {
        Some(spec) if spec.is_fallback() => Priority::Fallback,
        _ => requested,
    }
}

fn check_casts<'a>(info: &TypeInfo, apis: impl IntoIterator<Item = &'a TypeRef>) -> BindingResult<()> {
    for api in apis {
        if !info.can_cast(api) {
            return Err(BindingError::NotConvertible {
                api: api.name(),
                implementation: info.this().name(),
            });
        }
    }
    Ok(())
}

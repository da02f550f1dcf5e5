use fluid_tools::{
    Arguments, BindingResult, Bindings, Component, Dependency, NoBindings, Reflect, Registry,
    ResolutionResult, TypeInfo,
};
use std::sync::Arc;

trait Store: Send + Sync {
    fn kind(&self) -> &'static str;
}

impl Reflect for dyn Store {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>()
    }
}

struct Memory;

impl Store for Memory {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

impl Reflect for Memory {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().implements::<dyn Store>(|it| it).into()
    }
}

impl Component for Memory {
    fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Memory)
    }
}

struct Disk;

impl Store for Disk {
    fn kind(&self) -> &'static str {
        "disk"
    }
}

impl Reflect for Disk {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().implements::<dyn Store>(|it| it).into()
    }
}

impl Component for Disk {
    fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Disk)
    }
}

struct Service {
    store: Arc<dyn Store>,
}

impl Reflect for Service {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().into()
    }
}

impl Component for Service {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::component::<dyn Store>()]
    }

    fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Service {
            store: args.component()?,
        })
    }
}

struct DiskBindings;

impl Bindings for DiskBindings {
    fn bind(&self, registry: &mut Registry) -> BindingResult<()> {
        registry.bind_component::<Disk>()?;
        Ok(())
    }
}

fn parent() -> fluid_tools::Container {
    let mut registry = Registry::new();
    registry.bind_component::<Memory>().unwrap();
    registry.bind_component::<Service>().unwrap();
    registry.build()
}

#[test]
fn test_child_bindings_override_the_parent() {
    let parent = parent();
    let child = parent.make_child(&DiskBindings).unwrap();

    assert_eq!(child.get_component::<dyn Store>().unwrap().kind(), "disk");
    assert_eq!(parent.get_component::<dyn Store>().unwrap().kind(), "memory");
}

#[test]
fn test_parent_components_resolve_in_the_parent() {
    let parent = parent();
    let child = parent.make_child(&DiskBindings).unwrap();

    // Service is bound in the parent, so its store comes from the parent
    let from_child = child.get_component::<Service>().unwrap();
    let from_parent = parent.get_component::<Service>().unwrap();

    assert_eq!(from_child.store.kind(), "memory");
    assert!(Arc::ptr_eq(&from_child, &from_parent));
}

#[test]
fn test_child_without_bindings_shares_the_parent_cache() {
    let parent = parent();
    let child = parent.make_child(&NoBindings).unwrap();

    let a = parent.get_component::<dyn Store>().unwrap();
    let b = child.get_component::<dyn Store>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(child.cached_components(), 0);
}

#[test]
fn test_component_with_transient_bindings() {
    let parent = parent();

    let service = parent
        .get_component_with::<Service, _>(&|registry: &mut Registry| -> BindingResult<()> {
            registry.bind_component::<Disk>()?;
            registry.bind_component::<Service>()?;
            Ok(())
        })
        .unwrap();

    assert_eq!(service.store.kind(), "disk");
    assert_eq!(parent.get_component::<Service>().unwrap().store.kind(), "memory");
}

#[test]
fn test_grandchildren() {
    let parent = parent();
    let child = parent.make_child(&DiskBindings).unwrap();
    let grandchild = child
        .make_child(&|registry: &mut Registry| -> BindingResult<()> {
            registry.bind_component::<Service>()?;
            Ok(())
        })
        .unwrap();

    assert_eq!(grandchild.get_component::<Service>().unwrap().store.kind(), "disk");
    assert_eq!(grandchild.settings().max_depth, parent.settings().max_depth);
}

#[test]
fn test_child_outlives_its_handle_to_the_parent() {
    let child = parent().make_child(&DiskBindings).unwrap();

    assert_eq!(child.get_component::<Service>().unwrap().store.kind(), "memory");
}

use fluid_tools::{
    Arguments, Component, ComponentContext, ContextAnnotation, Dependency, Instance,
    PlatformContainer, Reflect, Registry, ResolutionResult, TypeInfo, TypeRef,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Profile(&'static str);

impl ContextAnnotation for Profile {
    const NAME: &'static str = "profile";

    fn value(&self) -> String {
        self.0.to_string()
    }
}

/// Answers `String` with the profile it was asked in.
struct Settings;

impl PlatformContainer for Settings {
    fn resolve(&self, api: &TypeRef, context: &ComponentContext) -> ResolutionResult<Option<Instance>> {
        if *api != TypeRef::of::<String>() {
            return Ok(None);
        }
        let profile = context.value("profile", "default");
        Ok(Some(Instance::new(Arc::new(format!("settings:{}", profile)))))
    }
}

struct App {
    settings: Arc<String>,
}

impl Reflect for App {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().into()
    }
}

impl Component for App {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::component::<String>().annotated(Profile("prod"))]
    }

    fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(App {
            settings: args.component()?,
        })
    }
}

#[test]
fn test_platform_sees_the_defined_context() {
    let mut registry = Registry::new();
    registry.bind_component::<App>().unwrap();
    registry.with_platform(Arc::new(Settings));

    let container = registry.build();
    assert_eq!(*container.get_component::<App>().unwrap().settings, "settings:prod");
    assert_eq!(*container.get_component::<String>().unwrap(), "settings:default");
}

#[test]
fn test_container_bindings_come_before_the_platform() {
    let mut registry = Registry::new();
    registry.bind_instance("local".to_string()).unwrap();
    registry.with_platform(Arc::new(Settings));

    let container = registry.build();
    assert_eq!(*container.get_component::<String>().unwrap(), "local");
}

#[test]
fn test_another_container_as_platform() {
    let mut outer = Registry::new();
    outer.bind_instance(7u32).unwrap();
    let outer = outer.build();

    let mut registry = Registry::new();
    registry.with_platform(Arc::new(outer.clone()));
    let container = registry.build();

    let value = container.get_component::<u32>().unwrap();
    assert!(Arc::ptr_eq(&value, &outer.get_component::<u32>().unwrap()));
    assert!(container.try_get_component::<u64>().unwrap().is_none());
}

/// Unit tests for component descriptors and dependency declarations

use fluid_tools::{
    AnnotationKey, Arguments, BindingKind, Blueprint, Component, ComponentContext, ComponentSpec,
    Container, ContextAnnotation, Dependency, DependencyKind, Lifetime, Priority, Reflect,
    Registry, ResolutionResult, TypeInfo, TypeRef,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Label(&'static str);

impl ContextAnnotation for Label {
    const NAME: &'static str = "label";
}

trait Sink: Send + Sync {}

impl Reflect for dyn Sink {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>()
    }
}

struct Console;

impl Sink for Console {}

impl Reflect for Console {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .implements::<dyn Sink>(|it| it)
            .component(ComponentSpec::new().stateful().fallback())
            .into()
    }
}

impl Component for Console {
    fn dependencies() -> Vec<Dependency> {
        vec![
            Dependency::component::<String>().optional(),
            Dependency::component::<dyn Sink>().deferred().annotated(Label("inner")),
            Dependency::group::<dyn Sink>(),
            Dependency::context(),
        ]
    }

    fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Console)
    }
}

#[test]
fn test_dependency_declarations() {
    let dependencies = Console::dependencies();

    assert_eq!(dependencies[0].kind(), DependencyKind::Component);
    assert_eq!(dependencies[0].api(), TypeRef::of::<String>());
    assert!(dependencies[0].is_optional());
    assert!(!dependencies[0].is_deferred());

    assert!(dependencies[1].is_deferred());
    assert_eq!(dependencies[1].annotations().len(), 1);
    assert_eq!(dependencies[1].annotations()[0].key(), AnnotationKey::of::<Label>());

    assert_eq!(dependencies[2].kind(), DependencyKind::Group);
    assert_eq!(dependencies[2].api(), TypeRef::of::<dyn Sink>());

    assert_eq!(dependencies[3].kind(), DependencyKind::Context);
    assert_eq!(dependencies[3].api(), TypeRef::of::<ComponentContext>());
}

#[test]
fn test_only_components_can_be_deferred() {
    assert!(!Dependency::group::<dyn Sink>().deferred().is_deferred());
    assert!(!Dependency::context().deferred().is_deferred());
}

#[test]
fn test_container_dependency() {
    let dependency = Dependency::container();
    assert_eq!(dependency.kind(), DependencyKind::Component);
    assert_eq!(dependency.api(), TypeRef::of::<Container>());
}

#[test]
fn test_blueprint_carries_declarations() {
    let blueprint = Blueprint::of::<Console>();
    assert_eq!(blueprint.implementation(), TypeRef::of::<Console>());
    assert_eq!(blueprint.dependencies().len(), 4);
}

#[test]
fn test_component_descriptor() {
    let mut registry = Registry::new();
    registry.bind_component::<Console>().unwrap();
    registry.bind_instance_as::<dyn Sink>(Arc::new(Console)).unwrap();

    let descriptors = registry.descriptors();
    assert_eq!(descriptors.len(), 2);

    let console = &descriptors[0];
    assert_eq!(console.implementation, TypeRef::of::<Console>());
    assert_eq!(console.apis, vec![TypeRef::of::<dyn Sink>()]);
    assert_eq!(console.priority, Priority::Fallback);
    assert_eq!(console.lifetime, Lifetime::Stateful);
    assert_eq!(console.kind, BindingKind::Component);
    assert!(!console.is_factory());

    let instance = &descriptors[1];
    assert_eq!(instance.kind, BindingKind::Instance);
    assert_eq!(instance.priority, Priority::Explicit);
    assert_eq!(instance.type_name(), TypeRef::of::<dyn Sink>().name());
}

#[test]
fn test_priority_order() {
    assert!(Priority::Explicit > Priority::Default);
    assert!(Priority::Default > Priority::Fallback);
}

/// Context propagation tests
///
/// These tests verify that context annotations reach exactly the components
/// that accept them, and that cached components are keyed by the context
/// they actually use.

use fluid_tools::{
    Arguments, Component, ComponentContext, ComponentReference, Composition, ContextAnnotation,
    Dependency, Reference, Reflect, Registry, ResolutionResult, TypeInfo, TypeRef,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Tenant(&'static str);

impl ContextAnnotation for Tenant {
    const NAME: &'static str = "tenant";

    fn value(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Feature(&'static str);

impl ContextAnnotation for Feature {
    const NAME: &'static str = "feature";
    const COMPOSITION: Composition = Composition::All;

    fn value(&self) -> String {
        self.0.to_string()
    }
}

/// Accepts the tenant.
struct Connection {
    tenant: String,
    context: ComponentContext,
}

impl Reflect for Connection {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().accepts::<Tenant>().into()
    }
}

impl Component for Connection {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::context()]
    }

    fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
        let context = args.context()?;
        Ok(Connection {
            tenant: context.value("tenant", "shared"),
            context,
        })
    }
}

/// Accepts nothing itself; sees the tenant only through its connection.
struct Repository {
    connection: Arc<Connection>,
    context: ComponentContext,
}

impl Reflect for Repository {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().into()
    }
}

impl Component for Repository {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::component::<Connection>(), Dependency::context()]
    }

    fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Repository {
            connection: args.component()?,
            context: args.context()?,
        })
    }
}

/// Pins the tenant of its repository through a class-level annotation.
struct AcmeReports {
    repository: Arc<Repository>,
}

impl Reflect for AcmeReports {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().defines(Tenant("acme")).into()
    }
}

impl Component for AcmeReports {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::component::<Repository>()]
    }

    fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(AcmeReports {
            repository: args.component()?,
        })
    }
}

/// Annotates a single dependency edge.
struct Billing {
    acme: Arc<Connection>,
    globex: Arc<Connection>,
}

impl Reflect for Billing {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().into()
    }
}

impl Component for Billing {
    fn dependencies() -> Vec<Dependency> {
        vec![
            Dependency::component::<Connection>().annotated(Tenant("acme")),
            Dependency::component::<Connection>().annotated(Tenant("globex")),
        ]
    }

    fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Billing {
            acme: args.component()?,
            globex: args.component()?,
        })
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.bind_component::<Connection>().unwrap();
    registry.bind_component::<Repository>().unwrap();
    registry.bind_component::<AcmeReports>().unwrap();
    registry.bind_component::<Billing>().unwrap();
    registry
}

#[test]
fn test_unannotated_resolution_has_empty_context() {
    let container = registry().build();
    let connection = container.get_component::<Connection>().unwrap();

    assert_eq!(connection.tenant, "shared");
    assert!(connection.context.is_empty());
}

#[test]
fn test_edge_annotations_select_distinct_instances() {
    let container = registry().build();
    let billing = container.get_component::<Billing>().unwrap();

    assert_eq!(billing.acme.tenant, "acme");
    assert_eq!(billing.globex.tenant, "globex");
    assert!(!Arc::ptr_eq(&billing.acme, &billing.globex));

    let acme = container.get_component_in::<Connection>(&[Tenant("acme").into()]).unwrap();
    assert!(Arc::ptr_eq(&acme, &billing.acme));
}

#[test]
fn test_class_annotations_reach_transitive_dependencies() {
    let container = registry().build();
    let reports = container.get_component::<AcmeReports>().unwrap();

    assert_eq!(reports.repository.connection.tenant, "acme");
}

#[test]
fn test_consumers_are_keyed_by_what_their_dependencies_accept() {
    let container = registry().build();

    let acme = container.get_component_in::<Repository>(&[Tenant("acme").into()]).unwrap();
    let globex = container.get_component_in::<Repository>(&[Tenant("globex").into()]).unwrap();
    let again = container.get_component_in::<Repository>(&[Tenant("acme").into()]).unwrap();

    assert!(!Arc::ptr_eq(&acme, &globex));
    assert!(Arc::ptr_eq(&acme, &again));
    assert_eq!(acme.connection.tenant, "acme");
    assert_eq!(globex.connection.tenant, "globex");

    // The repository does not accept the tenant itself
    assert!(acme.context.annotation::<Tenant>().is_none());
}

#[test]
fn test_deferred_dependencies_key_their_consumer() {
    /// Opens its connection on first use.
    struct LazyRepository {
        connection: Reference<Connection>,
    }

    impl Reflect for LazyRepository {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>().into()
        }
    }

    impl Component for LazyRepository {
        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::component::<Connection>().deferred()]
        }

        fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
            Ok(LazyRepository {
                connection: args.reference()?,
            })
        }
    }

    let mut registry = registry();
    registry.bind_component::<LazyRepository>().unwrap();
    let container = registry.build();

    let acme = container
        .get_component_in::<LazyRepository>(&[Tenant("acme").into()])
        .unwrap();
    let globex = container
        .get_component_in::<LazyRepository>(&[Tenant("globex").into()])
        .unwrap();
    let again = container
        .get_component_in::<LazyRepository>(&[Tenant("acme").into()])
        .unwrap();

    assert!(!Arc::ptr_eq(&acme, &globex));
    assert!(Arc::ptr_eq(&acme, &again));
    assert!(!acme.connection.is_ready());
    assert_eq!(acme.connection.get().unwrap().tenant, "acme");
    assert_eq!(globex.connection.get().unwrap().tenant, "globex");

    // Without a tenant the repository is shared with nobody above
    let shared = container.get_component::<LazyRepository>().unwrap();
    assert!(!Arc::ptr_eq(&shared, &acme));
    assert_eq!(shared.connection.get().unwrap().tenant, "shared");
}

#[test]
fn test_unaccepted_annotations_do_not_split_the_cache() {
    let container = registry().build();

    let plain = container.get_component::<Connection>().unwrap();
    let featured = container
        .get_component_in::<Connection>(&[Feature("beta").into()])
        .unwrap();

    assert!(Arc::ptr_eq(&plain, &featured));
}

#[test]
fn test_accumulating_annotations() {
    struct Flags {
        context: ComponentContext,
    }

    impl Reflect for Flags {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>().accepts::<Feature>().into()
        }
    }

    impl Component for Flags {
        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::context()]
        }

        fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
            Ok(Flags {
                context: args.context()?,
            })
        }
    }

    struct Experiment {
        flags: Arc<Flags>,
    }

    impl Reflect for Experiment {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>().defines(Feature("dark-mode")).into()
        }
    }

    impl Component for Experiment {
        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::component::<Flags>().annotated(Feature("new-checkout"))]
        }

        fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
            Ok(Experiment {
                flags: args.component()?,
            })
        }
    }

    let mut registry = Registry::new();
    registry.bind_component::<Flags>().unwrap();
    registry.bind_component::<Experiment>().unwrap();

    let container = registry.build();
    let experiment = container.get_component_in::<Experiment>(&[Feature("beta").into()]).unwrap();

    let features = experiment.flags.context.annotations::<Feature>();
    assert_eq!(
        features,
        vec![Feature("beta"), Feature("dark-mode"), Feature("new-checkout")]
    );
}

#[test]
fn test_component_reference_is_visible_when_accepted() {
    struct Named {
        reference: Option<ComponentReference>,
    }

    impl Reflect for Named {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>().accepts::<ComponentReference>().into()
        }
    }

    impl Component for Named {
        fn dependencies() -> Vec<Dependency> {
            vec![Dependency::context()]
        }

        fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
            Ok(Named {
                reference: args.context()?.annotation::<ComponentReference>(),
            })
        }
    }

    let mut registry = Registry::new();
    registry.bind_component::<Named>().unwrap();

    let container = registry.build();
    let named = container.get_component::<Named>().unwrap();

    assert_eq!(named.reference, Some(ComponentReference(TypeRef::of::<Named>())));
}

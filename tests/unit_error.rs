/// Unit tests for BindingError and ResolutionError

use fluid_tools::{BindingError, ResolutionError};
use std::error::Error;

#[test]
fn test_error_display_unresolved() {
    let error = ResolutionError::Unresolved {
        api: "app::Store",
        path: "app::Service".to_string(),
    };
    let display_str = format!("{}", error);
    assert_eq!(display_str, "no component bound to app::Store (path: app::Service)");
}

#[test]
fn test_error_display_circular() {
    let error = ResolutionError::Circular {
        api: "app::B",
        path: "app::A -> app::B -> app::A".to_string(),
    };
    let display_str = format!("{}", error);
    assert_eq!(display_str, "circular dependency on app::B: app::A -> app::B -> app::A");
}

#[test]
fn test_error_display_ambiguous() {
    let error = ResolutionError::Ambiguous {
        api: "app::Store",
        candidates: vec!["app::Memory", "app::Disk"],
    };
    assert_eq!(
        error.to_string(),
        "ambiguous binding for app::Store: app::Memory, app::Disk"
    );
}

#[test]
fn test_error_display_depth_exceeded() {
    let error = ResolutionError::DepthExceeded(100);
    let display_str = format!("{}", error);
    assert_eq!(display_str, "max depth 100 exceeded");
}

#[test]
fn test_error_display_factory_unbound() {
    let error = ResolutionError::FactoryUnbound {
        factory: "app::GreetingFactory",
        api: "app::Greeting",
    };
    assert_eq!(error.to_string(), "factory app::GreetingFactory did not bind app::Greeting");
}

#[test]
fn test_instantiation_error_chain() {
    let error = ResolutionError::Instantiation {
        component: "app::Database",
        path: "app::Service -> app::Database".to_string(),
        source: Box::new(ResolutionError::message("connection refused")),
    };

    assert_eq!(
        error.to_string(),
        "failed to instantiate app::Database (path: app::Service -> app::Database): connection refused"
    );
    assert_eq!(error.source().unwrap().to_string(), "connection refused");
    assert_eq!(error.root_cause().to_string(), "connection refused");
}

#[test]
fn test_nested_instantiation_errors_unwrap_to_the_cause() {
    let inner = ResolutionError::Instantiation {
        component: "app::Inner",
        path: "app::Inner".to_string(),
        source: Box::new(ResolutionError::PrematureAccess("app::Alpha")),
    };
    let outer = ResolutionError::Instantiation {
        component: "app::Outer",
        path: "app::Outer".to_string(),
        source: Box::new(inner),
    };

    assert!(matches!(outer.root_cause(), ResolutionError::PrematureAccess("app::Alpha")));
}

#[test]
fn test_failed_error_keeps_the_message() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
    let error = ResolutionError::failed(io);
    assert_eq!(error.to_string(), "config.toml");
    assert!(matches!(error.root_cause(), ResolutionError::Failed(_)));
}

#[test]
fn test_binding_errors_convert_to_resolution_errors() {
    let binding = BindingError::Duplicate {
        api: "app::Store",
        existing: "app::Memory",
    };
    let error: ResolutionError = binding.clone().into();

    assert_eq!(error.to_string(), binding.to_string());
    assert_eq!(
        binding.to_string(),
        "component mapping for app::Store already exists: app::Memory"
    );
}

#[test]
fn test_binding_error_equality() {
    assert_eq!(
        BindingError::VariantWithoutTarget("app::Variant"),
        BindingError::VariantWithoutTarget("app::Variant")
    );
    assert_ne!(
        BindingError::FactoryInterface("a"),
        BindingError::FactoryWithoutApi("a")
    );
}

#[test]
fn test_error_is_std_error() {
    fn takes_error(_: &dyn Error) {}

    takes_error(&ResolutionError::TypeMismatch("u32"));
    takes_error(&BindingError::FactoryWithoutApi("app::Factory"));
}

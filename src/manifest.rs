//! Service provider manifests.
//!
//! Renders the interfaces of automatically bound components as
//! `META-INF/services/<interface>` entries, one implementation name per
//! line, so that tooling outside the container can discover them.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{BindingError, BindingResult};
use crate::inspect::{inspect, Interfaces};
use crate::key::{Reflect, TypeRef};

/// Directory of the manifest entries.
pub const SERVICES_DIR: &str = "META-INF/services";

/// Implementations per component interface.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{Reflect, ServiceProviders, TypeInfo};
///
/// trait Codec: Send + Sync {}
/// impl Reflect for dyn Codec {
///     fn type_info() -> TypeInfo { TypeInfo::interface::<Self>() }
/// }
///
/// struct Json;
/// impl Codec for Json {}
/// impl Reflect for Json {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>().implements::<dyn Codec>(|it| it).into()
///     }
/// }
///
/// let mut providers = ServiceProviders::new();
/// assert!(providers.add_component::<Json>().unwrap());
///
/// let files = providers.files();
/// assert_eq!(files.len(), 1);
/// assert!(files[0].0.starts_with("META-INF/services/"));
/// assert!(files[0].1.ends_with("Json\n"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct ServiceProviders {
    entries: BTreeMap<TypeRef, Vec<&'static str>>,
}

impl ServiceProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the implementation for each of its interfaces.
    pub fn add(&mut self, interfaces: &Interfaces) -> BindingResult<()> {
        let implementation = interfaces.implementation.name();
        for api in interfaces.apis() {
            let providers = self.entries.entry(api).or_default();
            if providers.contains(&implementation) {
                return Err(BindingError::DuplicateProvider {
                    api: api.name(),
                    implementation,
                });
            }
            providers.push(implementation);
        }
        Ok(())
    }

    /// Inspects `T` and records it when it binds automatically.
    ///
    /// Returns `false` for components marked manual.
    pub fn add_component<T: Reflect>(&mut self) -> BindingResult<bool> {
        let info = T::type_info();
        if !info.component_spec().map_or(true, |spec| spec.is_automatic()) {
            return Ok(false);
        }
        self.add(&inspect(&info, &[])?)?;
        Ok(true)
    }

    /// Implementations recorded for `api`, in the order they were added.
    pub fn providers(&self, api: &TypeRef) -> &[&'static str] {
        self.entries.get(api).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Relative path and content of every manifest entry.
    pub fn files(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(api, providers)| {
                let mut content = String::new();
                for provider in providers {
                    content.push_str(provider);
                    content.push('\n');
                }
                (format!("{}/{}", SERVICES_DIR, file_name(api)), content)
            })
            .collect()
    }

    /// Writes the manifest entries below `root`.
    pub fn write_to(&self, root: &Path) -> io::Result<()> {
        let directory = root.join(SERVICES_DIR);
        fs::create_dir_all(&directory)?;
        for (path, content) in self.files() {
            fs::write(root.join(path), content)?;
        }
        tracing::debug!(root = %root.display(), entries = self.entries.len(), "wrote service manifests");
        Ok(())
    }
}

fn file_name(api: &TypeRef) -> &'static str {
    api.name().trim_start_matches("dyn ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComponentSpec, TypeInfo};

    trait Task: Send + Sync {}

    impl Reflect for dyn Task {
        fn type_info() -> TypeInfo {
            TypeInfo::interface::<Self>()
        }
    }

    struct Cleanup;
    impl Task for Cleanup {}
    impl Reflect for Cleanup {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>().implements::<dyn Task>(|it| it).into()
        }
    }

    struct Backup;
    impl Task for Backup {}
    impl Reflect for Backup {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>()
                .implements::<dyn Task>(|it| it)
                .component(ComponentSpec::new().manual())
                .into()
        }
    }

    #[test]
    fn duplicate_providers_are_rejected() {
        let mut providers = ServiceProviders::new();
        providers.add_component::<Cleanup>().unwrap();
        let error = providers.add_component::<Cleanup>().unwrap_err();
        assert!(matches!(error, BindingError::DuplicateProvider { .. }));
        assert_eq!(providers.providers(&TypeRef::of::<dyn Task>()).len(), 1);
    }

    #[test]
    fn manual_components_are_skipped() {
        let mut providers = ServiceProviders::new();
        assert!(!providers.add_component::<Backup>().unwrap());
        assert!(providers.is_empty());
    }

    #[test]
    fn entries_are_written_to_disk() {
        let mut providers = ServiceProviders::new();
        providers.add_component::<Cleanup>().unwrap();

        let root = std::env::temp_dir().join(format!("fluid-tools-manifest-{}", std::process::id()));
        providers.write_to(&root).unwrap();

        let (path, content) = &providers.files()[0];
        assert!(!path.contains("dyn "));
        assert_eq!(fs::read_to_string(root.join(path)).unwrap(), *content);
        fs::remove_dir_all(&root).unwrap();
    }
}

//! Interface inference for component implementations.
//!
//! [`inspect`] decides which component interfaces and which component group
//! interfaces an implementation is bound to. It is a pure function of the
//! [`TypeInfo`] descriptors involved; the registry caches its results per
//! implementation type.

use std::collections::HashSet;

use crate::error::{BindingError, BindingResult};
use crate::factory::{ComponentFactory, ComponentVariantFactory};
use crate::key::TypeRef;
use crate::types::{ComponentSpec, TypeInfo};

/// A component interface together with the groups it contributes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    pub api: TypeRef,
    pub groups: Vec<TypeRef>,
}

impl Specification {
    fn new(api: TypeRef, groups: Vec<TypeRef>) -> Self {
        Specification { api, groups }
    }
}

/// Component interfaces of one implementation, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interfaces {
    pub implementation: TypeRef,
    pub api: Vec<Specification>,
}

impl Interfaces {
    /// The component interfaces without their groups.
    pub fn apis(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.api.iter().map(|spec| spec.api)
    }

    /// Every group interface, de-duplicated, in first appearance order.
    pub fn groups(&self) -> Vec<TypeRef> {
        let mut groups = Vec::new();
        for spec in &self.api {
            merge(&mut groups, &spec.groups);
        }
        groups
    }

    pub fn specification(&self, api: &TypeRef) -> Option<&Specification> {
        self.api.iter().find(|spec| spec.api == *api)
    }
}

/// Computes the component and group interfaces of `implementation`.
///
/// With `restrictions`, only the listed interfaces (and what they resolve
/// to) are considered; each must be assignable from the implementation
/// unless it is a factory.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::{inspect, Reflect, TypeInfo, TypeRef};
///
/// trait Sink: Send + Sync {}
/// impl Reflect for dyn Sink {
///     fn type_info() -> TypeInfo { TypeInfo::interface::<Self>() }
/// }
///
/// struct FileSink;
/// impl Sink for FileSink {}
/// impl Reflect for FileSink {
///     fn type_info() -> TypeInfo {
///         TypeInfo::class::<Self>().implements::<dyn Sink>(|it| it).into()
///     }
/// }
///
/// let interfaces = inspect(&TypeRef::of::<FileSink>().info(), &[]).unwrap();
/// assert_eq!(interfaces.apis().collect::<Vec<_>>(), vec![TypeRef::of::<dyn Sink>()]);
/// assert!(interfaces.groups().is_empty());
/// ```
pub fn inspect(implementation: &TypeInfo, restrictions: &[TypeRef]) -> BindingResult<Interfaces> {
    let inspector = Inspector {
        implementation,
        factory: implementation.is_factory(),
    };

    let mut found = Vec::new();
    if restrictions.is_empty() {
        if inspector.factory
            && implementation.component_spec().is_none()
            && !implementation.is_anonymous()
        {
            return Err(BindingError::FactoryWithoutApi(implementation.this().name()));
        }
        let spec = implementation
            .component_spec()
            .cloned()
            .unwrap_or_default();
        let mut path = Vec::new();
        inspector.annotated(implementation, &spec, false, &mut path, &mut found)?;
    } else {
        for restriction in restrictions {
            if !inspector.factory && !implementation.is_assignable_to(restriction) {
                return Err(BindingError::NotAssignable {
                    api: restriction.name(),
                    implementation: implementation.this().name(),
                });
            }
            let mut nested = Vec::new();
            let mut path = Vec::new();
            inspector.interfaces(&restriction.info(), false, &mut path, &mut nested)?;
            for spec in nested {
                if inspector.factory || implementation.is_assignable_to(&spec.api) {
                    add(&mut found, spec);
                }
            }
        }
    }

    for spec in &found {
        if spec.api == TypeRef::of::<dyn ComponentFactory>()
            || spec.api == TypeRef::of::<dyn ComponentVariantFactory>()
        {
            return Err(BindingError::FactoryInterface(spec.api.name()));
        }
    }

    let api = inspector.filter(found)?;
    Ok(Interfaces {
        implementation: implementation.this(),
        api,
    })
}

struct Inspector<'a> {
    implementation: &'a TypeInfo,
    factory: bool,
}

impl Inspector<'_> {
    /// Recursive component interface discovery over `checked`.
    fn interfaces(
        &self,
        checked: &TypeInfo,
        reference: bool,
        path: &mut Vec<TypeRef>,
        found: &mut Vec<Specification>,
    ) -> BindingResult<()> {
        if path.contains(&checked.this()) {
            add(found, Specification::new(checked.this(), self.groups(checked)?));
            return Ok(());
        }

        let spec = match checked.component_spec() {
            Some(spec) => spec.clone(),
            None if checked.is_anonymous() => ComponentSpec::new(),
            None => {
                if checked.is_factory() {
                    return Err(BindingError::FactoryWithoutApi(checked.this().name()));
                }
                add(found, Specification::new(checked.this(), self.groups(checked)?));
                return Ok(());
            }
        };

        if reference && spec.is_automatic() && spec.scope().is_none() {
            let api = checked.this().name();
            let implementation = self.implementation.this().name();
            return Err(if checked.is_abstract() {
                BindingError::AbstractAutomaticApi { api, implementation }
            } else {
                BindingError::AutomaticApi { api, implementation }
            });
        }

        self.annotated(checked, &spec, reference, path, found)
    }

    fn annotated(
        &self,
        checked: &TypeInfo,
        spec: &ComponentSpec,
        reference: bool,
        path: &mut Vec<TypeRef>,
        found: &mut Vec<Specification>,
    ) -> BindingResult<()> {
        path.push(checked.this());

        if !spec.apis().is_empty() {
            for api in spec.apis() {
                if !self.factory && !checked.is_assignable_to(api) {
                    return Err(BindingError::NotAssignable {
                        api: api.name(),
                        implementation: checked.this().name(),
                    });
                }
                self.interfaces(&api.info(), true, path, found)?;
            }
        } else if !checked.interfaces().is_empty() {
            for interface in checked.interfaces() {
                let groups = self.groups(&interface.info())?;
                add(found, Specification::new(*interface, groups));
            }
        } else if let Some(superclass) = checked.superclass() {
            self.interfaces(&superclass.info(), reference, path, found)?;
        } else {
            add(found, Specification::new(checked.this(), self.groups(checked)?));
        }

        path.pop();
        Ok(())
    }

    fn groups(&self, candidate: &TypeInfo) -> BindingResult<Vec<TypeRef>> {
        let mut visited = HashSet::new();
        self.collect_groups(candidate, &mut visited)
    }

    fn collect_groups(
        &self,
        candidate: &TypeInfo,
        visited: &mut HashSet<TypeRef>,
    ) -> BindingResult<Vec<TypeRef>> {
        if !visited.insert(candidate.this()) {
            return Ok(Vec::new());
        }

        let Some(group) = candidate.group_spec() else {
            let mut groups = Vec::new();
            for next in candidate.superclass().iter().chain(candidate.interfaces()) {
                merge(&mut groups, &self.collect_groups(&next.info(), visited)?);
            }
            return Ok(groups);
        };

        if !group.apis().is_empty() {
            for api in group.apis() {
                if !self.factory && !candidate.is_assignable_to(api) {
                    return Err(BindingError::NotAssignable {
                        api: api.name(),
                        implementation: candidate.this().name(),
                    });
                }
            }
            return Ok(group.apis().to_vec());
        }

        if candidate.is_interface() {
            return Ok(vec![candidate.this()]);
        }

        if !candidate.interfaces().is_empty() {
            let mut groups = Vec::new();
            for interface in candidate.interfaces() {
                merge(&mut groups, &self.collect_groups(&interface.info(), visited)?);
            }
            if groups.is_empty() {
                groups = candidate.interfaces().to_vec();
            }
            return Ok(groups);
        }

        if candidate.is_final() {
            Ok(Vec::new())
        } else {
            Ok(vec![candidate.this()])
        }
    }

    /// Removes group interfaces from the component interfaces and adds the
    /// primitive twins of boxed interfaces.
    fn filter(&self, found: Vec<Specification>) -> BindingResult<Vec<Specification>> {
        let implementation = self.implementation.this();
        let explicit_groups = self
            .implementation
            .group_spec()
            .map_or(false, |group| !group.apis().is_empty());

        let mut result = if explicit_groups {
            // Only the listed groups leave the component interfaces; every
            // remaining interface carries them.
            let listed = self.groups(self.implementation)?;
            let mut retained: Vec<_> = found
                .into_iter()
                .filter(|spec| spec.api == implementation || !listed.contains(&spec.api))
                .collect();
            if retained.is_empty() {
                retained.push(Specification::new(implementation, Vec::new()));
            }
            for spec in &mut retained {
                merge(&mut spec.groups, &listed);
            }
            retained
        } else {
            let mut all_groups = Vec::new();
            for spec in &found {
                merge(&mut all_groups, &spec.groups);
            }

            let (removed, retained): (Vec<_>, Vec<_>) = found
                .into_iter()
                .partition(|spec| spec.api != implementation && all_groups.contains(&spec.api));

            let mut residual = self.groups(self.implementation)?;
            for spec in &removed {
                merge(&mut residual, &spec.groups);
            }
            residual.retain(|group| {
                !retained
                    .iter()
                    .any(|spec| spec.api != implementation && spec.groups.contains(group))
            });

            let mut result = retained;
            if !residual.is_empty() {
                add(&mut result, Specification::new(implementation, residual));
            }
            result
        };

        let twins: Vec<_> = result
            .iter()
            .filter_map(|spec| {
                spec.api
                    .info()
                    .primitive()
                    .map(|primitive| Specification::new(primitive, spec.groups.clone()))
            })
            .collect();
        for twin in twins {
            add(&mut result, twin);
        }

        Ok(result)
    }
}

/// Adds `spec`, merging groups into an existing entry for the same interface.
fn add(found: &mut Vec<Specification>, spec: Specification) {
    match found.iter_mut().find(|existing| existing.api == spec.api) {
        Some(existing) => merge(&mut existing.groups, &spec.groups),
        None => found.push(spec),
    }
}

fn merge(target: &mut Vec<TypeRef>, source: &[TypeRef]) {
    for item in source {
        if !target.contains(item) {
            target.push(*item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Reflect;
    use crate::types::GroupSpec;
    use std::sync::Arc;

    trait Reader: Send + Sync {}
    trait Writer: Send + Sync {}
    trait Plugin: Send + Sync {}

    impl Reflect for dyn Reader {
        fn type_info() -> TypeInfo {
            TypeInfo::interface::<Self>()
        }
    }

    impl Reflect for dyn Writer {
        fn type_info() -> TypeInfo {
            TypeInfo::interface::<Self>()
        }
    }

    impl Reflect for dyn Plugin {
        fn type_info() -> TypeInfo {
            TypeInfo::interface::<Self>().group(GroupSpec::new())
        }
    }

    struct Both;
    impl Reader for Both {}
    impl Writer for Both {}
    impl Plugin for Both {}

    impl Reflect for Both {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>()
                .implements::<dyn Reader>(|it| it)
                .implements::<dyn Writer>(|it| it)
                .into()
        }
    }

    struct PluginOnly;
    impl Plugin for PluginOnly {}

    impl Reflect for PluginOnly {
        fn type_info() -> TypeInfo {
            TypeInfo::final_class::<Self>()
                .implements::<dyn Plugin>(|it| it)
                .into()
        }
    }

    struct ReaderPlugin;
    impl Reader for ReaderPlugin {}
    impl Plugin for ReaderPlugin {}

    impl Reflect for ReaderPlugin {
        fn type_info() -> TypeInfo {
            TypeInfo::final_class::<Self>()
                .implements::<dyn Reader>(|it| it)
                .implements::<dyn Plugin>(|it| it)
                .into()
        }
    }

    struct Plain;

    impl Reflect for Plain {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>().into()
        }
    }

    struct Derived;
    impl Reader for Derived {}

    impl Reflect for Derived {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>()
                .extends::<Plain>()
                .component(ComponentSpec::new())
                .into()
        }
    }

    trait Sink: Send + Sync {}
    trait Service: Send + Sync {}

    impl Reflect for dyn Sink {
        fn type_info() -> TypeInfo {
            TypeInfo::interface::<Self>().extends::<dyn Plugin>()
        }
    }

    impl Reflect for dyn Service {
        fn type_info() -> TypeInfo {
            TypeInfo::interface::<Self>()
        }
    }

    struct Duplex;
    impl Reader for Duplex {}
    impl Writer for Duplex {}
    impl Sink for Duplex {}

    impl Reflect for Duplex {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>()
                .implements::<dyn Reader>(|it| it)
                .implements::<dyn Writer>(|it| it)
                .implements::<dyn Sink>(|it| it)
                .component(ComponentSpec::new().api::<dyn Reader>().api::<dyn Sink>())
                .into()
        }
    }

    struct Extension;
    impl Service for Extension {}
    impl Plugin for Extension {}

    impl Reflect for Extension {
        fn type_info() -> TypeInfo {
            TypeInfo::class::<Self>()
                .implements::<dyn Service>(|it| it)
                .implements::<dyn Plugin>(|it| it)
                .group(GroupSpec::new().api::<dyn Plugin>())
                .into()
        }
    }

    struct Standalone;
    impl Plugin for Standalone {}

    impl Reflect for Standalone {
        fn type_info() -> TypeInfo {
            TypeInfo::final_class::<Self>()
                .implements::<dyn Plugin>(|it| it)
                .group(GroupSpec::new().api::<dyn Plugin>())
                .into()
        }
    }

    fn apis(interfaces: &Interfaces) -> Vec<TypeRef> {
        interfaces.apis().collect()
    }

    #[test]
    fn unannotated_class_binds_its_interfaces() {
        let interfaces = inspect(&TypeRef::of::<Both>().info(), &[]).unwrap();
        assert_eq!(
            apis(&interfaces),
            vec![TypeRef::of::<dyn Reader>(), TypeRef::of::<dyn Writer>()]
        );
    }

    #[test]
    fn class_without_interfaces_binds_itself() {
        let interfaces = inspect(&TypeRef::of::<Plain>().info(), &[]).unwrap();
        assert_eq!(apis(&interfaces), vec![TypeRef::of::<Plain>()]);
        // non-final class without group annotation contributes no group
        assert!(interfaces.groups().is_empty());
    }

    #[test]
    fn superclass_is_followed_when_nothing_is_declared() {
        let interfaces = inspect(&TypeRef::of::<Derived>().info(), &[]).unwrap();
        assert_eq!(apis(&interfaces), vec![TypeRef::of::<Plain>()]);
    }

    #[test]
    fn group_interfaces_move_to_the_implementation() {
        let interfaces = inspect(&TypeRef::of::<PluginOnly>().info(), &[]).unwrap();
        assert_eq!(
            interfaces.api,
            vec![Specification::new(
                TypeRef::of::<PluginOnly>(),
                vec![TypeRef::of::<dyn Plugin>()]
            )]
        );
    }

    #[test]
    fn residual_groups_skip_retained_interfaces() {
        let interfaces = inspect(&TypeRef::of::<ReaderPlugin>().info(), &[]).unwrap();
        assert_eq!(
            apis(&interfaces),
            vec![TypeRef::of::<dyn Reader>(), TypeRef::of::<ReaderPlugin>()]
        );
        assert_eq!(interfaces.groups(), vec![TypeRef::of::<dyn Plugin>()]);
    }

    #[test]
    fn explicit_apis_keep_their_order_and_groups() {
        let interfaces = inspect(&TypeRef::of::<Duplex>().info(), &[]).unwrap();
        assert_eq!(
            interfaces.api,
            vec![
                Specification::new(TypeRef::of::<dyn Reader>(), vec![]),
                Specification::new(TypeRef::of::<dyn Sink>(), vec![TypeRef::of::<dyn Plugin>()]),
            ]
        );
    }

    #[test]
    fn explicit_group_stays_on_the_remaining_interfaces() {
        let interfaces = inspect(&TypeRef::of::<Extension>().info(), &[]).unwrap();
        assert_eq!(
            interfaces.api,
            vec![Specification::new(
                TypeRef::of::<dyn Service>(),
                vec![TypeRef::of::<dyn Plugin>()]
            )]
        );
        assert_eq!(interfaces.groups(), vec![TypeRef::of::<dyn Plugin>()]);
    }

    #[test]
    fn explicit_group_alone_binds_the_implementation() {
        let interfaces = inspect(&TypeRef::of::<Standalone>().info(), &[]).unwrap();
        assert_eq!(
            interfaces.api,
            vec![Specification::new(
                TypeRef::of::<Standalone>(),
                vec![TypeRef::of::<dyn Plugin>()]
            )]
        );
    }

    #[test]
    fn automatic_class_cannot_be_an_api() {
        struct Base;

        impl Reflect for Base {
            fn type_info() -> TypeInfo {
                TypeInfo::class::<Self>()
                    .component(ComponentSpec::new())
                    .into()
            }
        }

        struct Sub;

        impl Reflect for Sub {
            fn type_info() -> TypeInfo {
                TypeInfo::class::<Self>()
                    .extends::<Base>()
                    .component(ComponentSpec::new().api::<Base>())
                    .into()
            }
        }

        let error = inspect(&TypeRef::of::<Sub>().info(), &[]).unwrap_err();
        assert_eq!(
            error,
            BindingError::AutomaticApi {
                api: TypeRef::of::<Base>().name(),
                implementation: TypeRef::of::<Sub>().name(),
            }
        );
    }

    #[test]
    fn automatic_interface_cannot_be_an_api() {
        trait Auto: Send + Sync {}

        impl Reflect for dyn Auto {
            fn type_info() -> TypeInfo {
                TypeInfo::interface::<Self>().component(ComponentSpec::new())
            }
        }

        struct AutoImpl;
        impl Auto for AutoImpl {}

        impl Reflect for AutoImpl {
            fn type_info() -> TypeInfo {
                TypeInfo::class::<Self>()
                    .implements::<dyn Auto>(|it| it)
                    .component(ComponentSpec::new().api::<dyn Auto>())
                    .into()
            }
        }

        let error = inspect(&TypeRef::of::<AutoImpl>().info(), &[]).unwrap_err();
        assert!(matches!(error, BindingError::AbstractAutomaticApi { .. }));
    }

    #[test]
    fn class_listing_itself_binds_itself() {
        struct Itself;

        impl Reflect for Itself {
            fn type_info() -> TypeInfo {
                TypeInfo::class::<Self>()
                    .component(ComponentSpec::new().api::<Itself>())
                    .into()
            }
        }

        let interfaces = inspect(&TypeRef::of::<Itself>().info(), &[]).unwrap();
        assert_eq!(apis(&interfaces), vec![TypeRef::of::<Itself>()]);
    }

    #[test]
    fn mutually_referencing_interfaces_terminate() {
        trait Left: Send + Sync {}
        trait Right: Send + Sync {}

        impl Reflect for dyn Left {
            fn type_info() -> TypeInfo {
                TypeInfo::interface::<Self>()
                    .extends::<dyn Right>()
                    .component(ComponentSpec::new().manual().api::<dyn Right>())
            }
        }

        impl Reflect for dyn Right {
            fn type_info() -> TypeInfo {
                TypeInfo::interface::<Self>()
                    .extends::<dyn Left>()
                    .component(ComponentSpec::new().manual().api::<dyn Left>())
            }
        }

        struct Pair;
        impl Left for Pair {}
        impl Right for Pair {}

        impl Reflect for Pair {
            fn type_info() -> TypeInfo {
                TypeInfo::class::<Self>()
                    .implements::<dyn Left>(|it| it)
                    .implements::<dyn Right>(|it| it)
                    .component(ComponentSpec::new().api::<dyn Left>())
                    .into()
            }
        }

        let interfaces = inspect(&TypeRef::of::<Pair>().info(), &[]).unwrap();
        assert_eq!(apis(&interfaces), vec![TypeRef::of::<dyn Left>()]);
    }

    #[test]
    fn restrictions_limit_the_result() {
        let interfaces =
            inspect(&TypeRef::of::<Both>().info(), &[TypeRef::of::<dyn Writer>()]).unwrap();
        assert_eq!(apis(&interfaces), vec![TypeRef::of::<dyn Writer>()]);
    }

    #[test]
    fn restriction_must_be_assignable() {
        let error =
            inspect(&TypeRef::of::<Plain>().info(), &[TypeRef::of::<dyn Reader>()]).unwrap_err();
        assert!(matches!(error, BindingError::NotAssignable { .. }));
    }

    #[test]
    fn primitive_twin_is_added() {
        struct Boxed(u32);

        impl Reflect for Boxed {
            fn type_info() -> TypeInfo {
                TypeInfo::final_class::<Self>()
                    .component(ComponentSpec::new())
                    .boxes::<u32>(|it| Arc::new(it.0))
                    .into()
            }
        }

        let interfaces = inspect(&TypeRef::of::<Boxed>().info(), &[]).unwrap();
        assert_eq!(
            apis(&interfaces),
            vec![TypeRef::of::<Boxed>(), TypeRef::of::<u32>()]
        );
    }
}

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fluid_tools::*;

// ===== Test Components =====

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Tenant(u32);

impl ContextAnnotation for Tenant {
    const NAME: &'static str = "tenant";

    fn value(&self) -> String {
        self.0.to_string()
    }
}

struct Expensive {
    data: Vec<u64>,
}

impl Reflect for Expensive {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().into()
    }
}

impl Component for Expensive {
    fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Expensive {
            data: (0..1000).collect(),
        })
    }
}

struct Payload {
    data: [u8; 64],
}

impl Reflect for Payload {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>().accepts::<Tenant>().into()
    }
}

impl Component for Payload {
    fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Payload { data: [0; 64] })
    }
}

struct Fresh {
    data: [u8; 64],
}

impl Reflect for Fresh {
    fn type_info() -> TypeInfo {
        TypeInfo::class::<Self>()
            .component(ComponentSpec::new().stateful())
            .into()
    }
}

impl Component for Fresh {
    fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
        Ok(Fresh { data: [0; 64] })
    }
}

trait Plugin: Send + Sync {
    fn id(&self) -> usize;
}

impl Reflect for dyn Plugin {
    fn type_info() -> TypeInfo {
        TypeInfo::interface::<Self>().group(GroupSpec::new())
    }
}

macro_rules! plugin {
    ($($name:ident = $id:expr),*) => {
        $(
            struct $name;

            impl Plugin for $name {
                fn id(&self) -> usize {
                    $id
                }
            }

            impl Reflect for $name {
                fn type_info() -> TypeInfo {
                    TypeInfo::class::<Self>().implements::<dyn Plugin>(|it| it).into()
                }
            }

            impl Component for $name {
                fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
                    Ok($name)
                }
            }
        )*
    };
}

plugin!(P0 = 0, P1 = 1, P2 = 2, P3 = 3);

// Chain of five dependencies, each cached
macro_rules! chain {
    ($head:ident) => {
        struct $head;

        impl Reflect for $head {
            fn type_info() -> TypeInfo {
                TypeInfo::class::<Self>().into()
            }
        }

        impl Component for $head {
            fn construct(_: &mut Arguments<'_>) -> ResolutionResult<Self> {
                Ok($head)
            }
        }
    };
    ($head:ident -> $next:ident) => {
        struct $head {
            _next: std::sync::Arc<$next>,
        }

        impl Reflect for $head {
            fn type_info() -> TypeInfo {
                TypeInfo::class::<Self>().into()
            }
        }

        impl Component for $head {
            fn dependencies() -> Vec<Dependency> {
                vec![Dependency::component::<$next>()]
            }

            fn construct(args: &mut Arguments<'_>) -> ResolutionResult<Self> {
                Ok($head { _next: args.component()? })
            }
        }
    };
}

chain!(Level0 -> Level1);
chain!(Level1 -> Level2);
chain!(Level2 -> Level3);
chain!(Level3 -> Level4);
chain!(Level4);

fn chain_registry() -> Registry {
    let mut registry = Registry::new();
    registry.bind_component::<Level0>().unwrap();
    registry.bind_component::<Level1>().unwrap();
    registry.bind_component::<Level2>().unwrap();
    registry.bind_component::<Level3>().unwrap();
    registry.bind_component::<Level4>().unwrap();
    registry
}

// ===== Micro Benchmarks =====

fn bench_cached_hit(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.bind_instance(42u64).unwrap();
    registry.bind_component::<Expensive>().unwrap();
    let container = registry.build();

    // Prime the cache
    let _ = container.get_component::<Expensive>().unwrap();

    c.bench_function("instance_hit_u64", |b| {
        b.iter(|| {
            let v = container.get_component::<u64>().unwrap();
            black_box(v);
        })
    });

    c.bench_function("cached_hit", |b| {
        b.iter(|| {
            let v = container.get_component::<Expensive>().unwrap();
            black_box(v.data.len());
        })
    });
}

fn bench_cached_cold(c: &mut Criterion) {
    c.bench_function("cached_cold_expensive", |b| {
        b.iter_batched(
            || {
                let mut registry = Registry::new();
                registry.bind_component::<Expensive>().unwrap();
                registry.build()
            },
            |container| {
                let v = container.get_component::<Expensive>().unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("chain_cold_depth_5", |b| {
        b.iter_batched(
            || chain_registry().build(),
            |container| {
                let v = container.get_component::<Level0>().unwrap();
                black_box(v);
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_cached_vs_stateful(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_vs_stateful");

    let mut registry = Registry::new();
    registry.bind_component::<Payload>().unwrap();
    registry.bind_component::<Fresh>().unwrap();
    let container = registry.build();

    group.bench_function("cached_hit", |b| {
        b.iter(|| {
            let v = container.get_component::<Payload>().unwrap();
            black_box(&v.data);
        })
    });

    group.bench_function("stateful", |b| {
        b.iter(|| {
            let v = container.get_component::<Fresh>().unwrap();
            black_box(&v.data);
        })
    });

    group.finish();
}

fn bench_per_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("per_context");

    for tenants in [1u32, 16, 256] {
        let mut registry = Registry::new();
        registry.bind_component::<Payload>().unwrap();
        let container = registry.build();
        let contexts: Vec<Vec<AnnotationInstance>> =
            (0..tenants).map(|t| vec![Tenant(t).into()]).collect();

        group.bench_with_input(BenchmarkId::new("tenants", tenants), &contexts, |b, contexts| {
            let mut i = 0;
            b.iter(|| {
                let v = container
                    .get_component_in::<Payload>(&contexts[i % contexts.len()])
                    .unwrap();
                i += 1;
                black_box(&v.data);
            })
        });
    }

    group.finish();
}

fn bench_group_resolution(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.bind_component::<P0>().unwrap();
    registry.bind_component::<P1>().unwrap();
    registry.bind_component::<P2>().unwrap();
    registry.bind_component::<P3>().unwrap();
    let container = registry.build();

    c.bench_function("group_of_4", |b| {
        b.iter(|| {
            let plugins = container.get_component_group::<dyn Plugin>().unwrap();
            black_box(plugins.iter().map(|p| p.id()).sum::<usize>());
        })
    });
}

fn bench_child_container(c: &mut Criterion) {
    let container = chain_registry().build();
    let _ = container.get_component::<Level0>().unwrap();

    c.bench_function("child_create_and_resolve", |b| {
        b.iter(|| {
            let child = container.make_child(&NoBindings).unwrap();
            let v = child.get_component::<Level0>().unwrap();
            black_box(v);
        })
    });
}

criterion_group!(
    benches,
    bench_cached_hit,
    bench_cached_cold,
    bench_cached_vs_stateful,
    bench_per_context,
    bench_group_resolution,
    bench_child_container
);
criterion_main!(benches);

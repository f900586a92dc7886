use berth_core::{build_plan, PlanOptions, ResolutionEngine};
use berth_registry::{DependencyRef, Registry};
use berth_schema::{
    image_name, ContainerType, HashVersion, PackageTarget, Requirement, RepositoryKey,
    ResolverSpec, ToolId, ToolRequirements,
};
use criterion::{criterion_group, criterion_main, Criterion};
use tokio_util::sync::CancellationToken;

fn targets(count: usize) -> Vec<PackageTarget> {
    (0..count)
        .map(|i| PackageTarget::new(&format!("package{i:02}"), Some("1.2.3")))
        .collect()
}

fn bench_mulled_names(c: &mut Criterion) {
    let single = targets(1);
    let ten = targets(10);
    c.bench_function("mulled_v2_single_package", |b| {
        b.iter(|| image_name(&single, HashVersion::V2, Some("0")).unwrap());
    });
    c.bench_function("mulled_v2_10_packages", |b| {
        b.iter(|| image_name(&ten, HashVersion::V2, Some("0")).unwrap());
    });
    c.bench_function("mulled_v1_10_packages", |b| {
        b.iter(|| image_name(&ten, HashVersion::V1, None).unwrap());
    });
}

fn bench_resolve_tool(c: &mut Criterion) {
    let spec = ResolverSpec::from_toml_str(
        r#"
[[resolvers]]
type = "mapping"
mappings = [
  { container_type = "docker", tool_id = "mapped", identifier = "registry.local/mapped:1" },
]

[[resolvers]]
type = "explicit"

[[resolvers]]
type = "mulled"
"#,
        None,
    )
    .unwrap();
    let engine = ResolutionEngine::new(&spec);
    let tool = ToolRequirements {
        id: ToolId::new("bwa_mem"),
        requirements: vec![
            Requirement::package("bwa", Some("0.7.17")),
            Requirement::package("samtools", Some("1.9")),
            Requirement::package("pigz", Some("2.4")),
        ],
    };

    c.bench_function("resolve_tool_mulled_3pkg", |b| {
        b.iter(|| {
            engine
                .resolve_tool(&tool, &[ContainerType::Docker, ContainerType::Singularity])
                .unwrap()
        });
    });
}

fn key(name: &str) -> RepositoryKey {
    RepositoryKey::new("toolshed.example.org", "devteam", name, "0a1b2c3d").unwrap()
}

/// A layered graph where every repository depends on every repository of the
/// next layer.
fn layered_registry(layers: usize, width: usize) -> Registry {
    let mut registry = Registry::new();
    let name = |layer: usize, i: usize| format!("repo_{layer}_{i}");
    registry.publish(
        key("root"),
        (0..width).map(|i| DependencyRef::new(key(&name(0, i)))).collect(),
    );
    for layer in 0..layers {
        for i in 0..width {
            let deps = if layer + 1 < layers {
                (0..width)
                    .map(|j| DependencyRef::new(key(&name(layer + 1, j))))
                    .collect()
            } else {
                vec![]
            };
            registry.publish(key(&name(layer, i)), deps);
        }
    }
    registry
}

fn bench_build_plan(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let registry = layered_registry(6, 8);
    let root = key("root");

    c.bench_function("build_plan_6x8_layers", |b| {
        b.iter(|| {
            runtime
                .block_on(build_plan(
                    &root,
                    &registry,
                    PlanOptions::default(),
                    &CancellationToken::new(),
                ))
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_mulled_names,
    bench_resolve_tool,
    bench_build_plan,
);
criterion_main!(benches);

use berth_core::{ResolutionEngine, ResolverChain};
use berth_resolvers::ResolutionContext;
use berth_schema::{ContainerType, Requirement, ResolverSpec, ToolId, ToolRequirements};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const MAPPED: &str = r#"
[[resolvers]]
type = "mapping"
mappings = [
  { container_type = "docker", tool_id = "bwa_mem", identifier = "registry.local/bwa:pinned" },
]

[[resolvers]]
type = "explicit"

[[resolvers]]
type = "mulled"
"#;

fn bwa_tool() -> ToolRequirements {
    ToolRequirements {
        id: ToolId::new("bwa_mem"),
        requirements: vec![
            Requirement::package("bwa", Some("0.7.15")),
            Requirement::package("samtools", Some("1.3.1")),
        ],
    }
}

fn container_identifier(result: &berth_schema::ResolutionResult) -> String {
    result
        .container
        .as_ref()
        .map(|c| c.identifier.to_string())
        .unwrap_or_default()
}

#[test]
fn mapping_takes_priority_over_mulled() {
    let spec = ResolverSpec::from_toml_str(MAPPED, None).unwrap();
    let engine = ResolutionEngine::new(&spec);

    let results = engine
        .resolve_tool(&bwa_tool(), &[ContainerType::Docker])
        .unwrap();
    assert_eq!(results.len(), 3);
    let docker = &results[2];
    assert!(docker.satisfied);
    assert_eq!(docker.resolver_name.as_deref(), Some("mapping"));
    assert_eq!(container_identifier(docker), "registry.local/bwa:pinned");
}

#[test]
fn unmapped_tool_falls_through_to_mulled() {
    let spec = ResolverSpec::from_toml_str(MAPPED, None).unwrap();
    let engine = ResolutionEngine::new(&spec);
    let mut tool = bwa_tool();
    tool.id = ToolId::new("other_tool");

    let results = engine.resolve_tool(&tool, &[ContainerType::Docker]).unwrap();
    let docker = &results[2];
    assert_eq!(docker.resolver_name.as_deref(), Some("mulled"));
    let id = container_identifier(docker);
    assert!(id.starts_with("quay.io/biocontainers/mulled-v2-"), "{id}");
}

#[test]
fn package_requirements_stay_unsatisfied_without_package_resolvers() {
    let engine = ResolutionEngine::new(&ResolverSpec::preset("default").unwrap());
    let results = engine.resolve_tool(&bwa_tool(), &[]).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.satisfied && r.error.is_none()));
}

#[test]
fn packages_resolver_finds_installed_tree() {
    let base = tempfile::tempdir().unwrap();
    let bin = base.path().join("bwa").join("0.7.15").join("bin");
    fs::create_dir_all(&bin).unwrap();

    let config = format!(
        "[[resolvers]]\ntype = \"packages\"\nbase_path = \"{}\"\n",
        base.path().display()
    );
    let engine = ResolutionEngine::new(&ResolverSpec::from_toml_str(&config, None).unwrap());
    let results = engine.resolve_tool(&bwa_tool(), &[]).unwrap();

    assert!(results[0].satisfied);
    let dep = results[0].dependency.as_ref().unwrap();
    assert!(dep.exact);
    assert_eq!(dep.path, base.path().join("bwa").join("0.7.15"));
    assert!(!results[1].satisfied);
}

#[test]
fn resolve_all_keeps_input_order() {
    let engine = ResolutionEngine::new(&ResolverSpec::preset("default").unwrap());
    let tool = bwa_tool();
    let ctx = ResolutionContext::for_tool(&tool);
    let reqs = vec![
        Requirement::container(ContainerType::Singularity, ""),
        Requirement::package("bwa", Some("0.7.15")),
        Requirement::container(ContainerType::Docker, ""),
    ];
    let results = engine.resolve_all(&reqs, &ctx);
    let kinds: Vec<String> = results.iter().map(|r| r.requirement.to_string()).collect();
    assert_eq!(
        kinds,
        ["singularity container", "bwa@0.7.15 (package)", "docker container"]
    );
    assert!(!results[0].satisfied);
    assert!(results[2].satisfied);
}

#[test]
fn reload_while_resolving() {
    let mapped = ResolverSpec::from_toml_str(MAPPED, None).unwrap();
    let plain = ResolverSpec::preset("default").unwrap();
    let engine = Arc::new(ResolutionEngine::new(&mapped));
    let stop = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(5));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        let stop = Arc::clone(&stop);
        let b = Arc::clone(&barrier);
        readers.push(thread::spawn(move || {
            let tool = bwa_tool();
            b.wait();
            let mut seen = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let results = engine.resolve_tool(&tool, &[ContainerType::Docker]).unwrap();
                let docker = &results[2];
                assert!(docker.satisfied);
                let name = docker.resolver_name.as_deref().unwrap();
                assert!(name == "mapping" || name == "mulled", "{name}");
                seen += 1;
            }
            seen
        }));
    }

    barrier.wait();
    for i in 0..50 {
        engine.reload(if i % 2 == 0 { &plain } else { &mapped });
    }
    stop.store(true, Ordering::SeqCst);

    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(engine.status().len(), mapped.len());
}

#[test]
fn snapshot_survives_reload() {
    let engine = ResolutionEngine::new(&ResolverSpec::from_toml_str(MAPPED, None).unwrap());
    let before = engine.snapshot();
    engine.reload(&ResolverSpec::preset("explicit").unwrap());

    assert_eq!(before.len(), 3);
    assert_eq!(engine.snapshot().len(), 1);
}

#[test]
fn reload_from_path_swaps_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("berth.toml");
    fs::write(&path, MAPPED).unwrap();

    let engine = ResolutionEngine::from_chain(ResolverChain::new(vec![]));
    assert!(engine.status().is_empty());
    engine.reload_from_path(&path).unwrap();

    let types: Vec<String> = engine.status().into_iter().map(|s| s.resolver_type).collect();
    assert_eq!(types, ["mapping", "explicit", "mulled"]);
}

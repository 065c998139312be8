//! Common utilities for benchmarks

use std::sync::Arc;
use std::time::Duration;

use criterion::Criterion;
use serde_json::json;
use sprig_config::TargetConfig;
use sprig_core::{CONFIG_NAME, ROOT_ID};
use sprig_host::{MemoryHost, PackageSources};
use sprig_resolver::Project;

pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(50)
}

/// Manifest text of `name` depending on every id in `deps` with `*`
pub fn manifest(name: &str, deps: &[String]) -> String {
    let dependencies: serde_json::Map<String, serde_json::Value> = deps
        .iter()
        .map(|d| (d.clone(), json!("*")))
        .collect();
    json!({
        "name": name,
        "dependencies": dependencies,
        "files": [format!("{}.ts", name)],
        "nativeBuild": {"config": {(name): {"enabled": 1}}}
    })
    .to_string()
}

/// Installed project of `size` packages `p0..`; package `i` imports up to
/// `fan_out` of the packages after it, so the graph is a layered DAG with
/// plenty of shared imports
pub fn dag_host(size: usize, fan_out: usize) -> MemoryHost {
    let host = MemoryHost::new();
    let ids: Vec<String> = (0..size).map(|i| format!("p{}", i)).collect();

    let roots: Vec<String> = ids.iter().take(fan_out).cloned().collect();
    host.insert_file(ROOT_ID, CONFIG_NAME, manifest("game", &roots));

    for (i, id) in ids.iter().enumerate() {
        let deps: Vec<String> = ids.iter().skip(i + 1).step_by(2).take(fan_out).cloned().collect();
        host.insert_file(id, CONFIG_NAME, manifest(id, &deps));
        host.insert_file(id, format!("{}.ts", id), "");
    }
    host
}

pub fn project(host: MemoryHost) -> Project {
    let target = TargetConfig::new("bench", "1.0.0");
    let sources = PackageSources::new(Arc::new(target)).expect("benchmark target is valid");
    Project::new(Arc::new(host), Arc::new(sources))
}

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

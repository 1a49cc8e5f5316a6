//! Integration tests for resource instantiation.

use moor_manifest::{AppManifest, ClusterConfig, ManifestError};
use moor_resource::{instance_name, render_instance, ResourceError};
use serde_yaml::Mapping;

const REDIS_TEMPLATE: &str = r#"
appname: redis
apptype: resource
build:
  base: redis:7
  script:
    - make
worker.redis:
  cmd: redis-server
  memory: "{{memory}}"
  num_instances: "{{instances}}"
  port: "{{port}}:tcp"
"#;

fn context(yaml: &str) -> Mapping {
    serde_yaml::from_str(yaml).unwrap()
}

fn cluster() -> ClusterConfig {
    ClusterConfig::default().with_domains(vec!["example.com".to_string()])
}

#[test]
fn test_rendered_instance_loads_as_manifest() {
    let instance = render_instance(
        "redis",
        "7-abc",
        REDIS_TEMPLATE,
        "hello",
        &context("memory: 64m\ninstances: 2\nport: 6379"),
        &cluster(),
    )
    .unwrap();

    let manifest = AppManifest::load(&instance, "7-abc", None, &cluster()).unwrap();
    assert_eq!(manifest.appname, "resource.redis.hello");
    let proc = manifest.proc("redis").unwrap();
    assert_eq!(proc.memory, "64m");
    // rendered scalar reinterpreted as an integer
    assert_eq!(proc.num_instances, 2);
    assert!(proc.ports.contains_key(&6379));
}

#[test]
fn test_numeric_memory_survives_render_round_trip() {
    // "{{memory}}" with an integer context value renders to a YAML number;
    // the loaded instance must keep it instead of the default
    let instance = render_instance(
        "redis",
        "7-abc",
        REDIS_TEMPLATE,
        "hello",
        &context("memory: 64\ninstances: 2\nport: 6379"),
        &cluster(),
    )
    .unwrap();

    let manifest = AppManifest::load(&instance, "7-abc", None, &cluster()).unwrap();
    assert_eq!(manifest.proc("redis").unwrap().memory, "64");
}

#[test]
fn test_type_key_stripped() {
    let instance = render_instance(
        "redis",
        "7-abc",
        REDIS_TEMPLATE,
        "hello",
        &context("memory: 64m\ninstances: 2\nport: 6379"),
        &cluster(),
    )
    .unwrap();
    assert!(!instance.contains("apptype"));
    assert!(instance.contains("appname: resource.redis.hello"));
}

#[test]
fn test_instance_name_is_reserved_prefixed() {
    assert_eq!(instance_name("redis", "a.b"), "resource.redis.a.b");
}

#[test]
fn test_missing_context_variable_fails() {
    let err = render_instance(
        "redis",
        "7-abc",
        REDIS_TEMPLATE,
        "hello",
        &context("memory: 64m"),
        &cluster(),
    )
    .unwrap_err();
    assert!(matches!(err, ResourceError::UnresolvedVariable { .. }));
}

#[test]
fn test_invalid_rendered_manifest_fails() {
    // context renders a manifest whose build section is gone
    let template = "appname: broken\nworker.w1:\n  cmd: \"{{cmd}}\"\n";
    let err = render_instance(
        "broken",
        "1",
        template,
        "hello",
        &context("cmd: run"),
        &cluster(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ResourceError::Manifest(ManifestError::MissingBuildSection(_))
    ));
}

#[test]
fn test_client_context_replaces_template_defaults() {
    // same-named variables come only from the client context
    let instance = render_instance(
        "redis",
        "7-abc",
        REDIS_TEMPLATE,
        "other",
        &context("memory: 256m\ninstances: 8\nport: 6380"),
        &cluster(),
    )
    .unwrap();
    let manifest = AppManifest::load(&instance, "7-abc", None, &cluster()).unwrap();
    let proc = manifest.proc("redis").unwrap();
    assert_eq!(proc.memory, "256m");
    assert_eq!(proc.num_instances, 8);
}

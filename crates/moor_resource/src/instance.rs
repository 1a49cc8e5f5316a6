//! Resource instance manifests.
//!
//! A resource is a reusable templated manifest. When a client application
//! declares it in `use_resources`, the template is rendered with the
//! client's context variables, validated as a manifest, and re-addressed
//! as a per-client instance.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use moor_manifest::{AppManifest, ClusterConfig};

use crate::error::{ResourceError, ResourceResult};
use crate::renderer::ResourceRenderer;

/// Key removed from the rendered instance manifest.
const TYPE_KEY: &str = "apptype";

/// Instance identifier for a resource consumed by a client application.
pub fn instance_name(resource_appname: &str, client_appname: &str) -> String {
    format!("resource.{resource_appname}.{client_appname}")
}

/// Render a resource template into a concrete instance manifest.
///
/// The template text is rendered with the client's context, validated
/// through [`AppManifest::load`], re-addressed to the instance name, and
/// returned as document text ready to be loaded again.
pub fn render_instance(
    resource_appname: &str,
    resource_meta_version: &str,
    template: &str,
    client_appname: &str,
    context: &Mapping,
    cluster: &ClusterConfig,
) -> ResourceResult<String> {
    debug!(
        "rendering resource '{}' for client '{}'",
        resource_appname, client_appname
    );
    let template_value: Value = serde_yaml::from_str(template)?;
    let rendered = ResourceRenderer::new().render_value(&template_value, context)?;

    // the rendered structure must still be a well-formed manifest
    let instance_yaml = serde_yaml::to_string(&rendered)?;
    let _ = AppManifest::load(&instance_yaml, resource_meta_version, None, cluster)?;

    let mut instance = match rendered {
        Value::Mapping(mapping) => mapping,
        _ => return Err(ResourceError::NotAMapping),
    };
    instance.insert(
        Value::String("appname".to_string()),
        Value::String(instance_name(resource_appname, client_appname)),
    );
    instance.remove(Value::String(TYPE_KEY.to_string()));

    Ok(serde_yaml::to_string(&Value::Mapping(instance))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_name() {
        assert_eq!(instance_name("redis", "hello"), "resource.redis.hello");
    }
}

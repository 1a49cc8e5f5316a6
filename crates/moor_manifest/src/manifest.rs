//! The top-level application manifest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::build::{BuildSpec, ReleaseSpec, TestSpec};
use crate::config::{ClusterConfig, RESERVED_APPNAMES};
use crate::error::{raw_snippet, ManifestError, ManifestResult};
use crate::proc::{is_proc_section, ProcSpec};
use crate::value::{field, string_seq};

/// One `use_resources` declaration: the services consumed from a resource
/// plus free-form template context for its instantiation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceUsage {
    pub services: Vec<String>,
    pub context: Mapping,
}

/// Validated in-memory model of one application manifest.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppManifest {
    pub appname: String,
    pub meta_version: String,
    pub procs: BTreeMap<String, ProcSpec>,
    pub build: BuildSpec,
    pub release: ReleaseSpec,
    pub test: TestSpec,
    /// Opaque notification configuration, passed through untouched.
    pub notify: Mapping,
    /// Opaque service usage declarations, passed through untouched.
    pub use_services: Mapping,
    pub use_resources: BTreeMap<String, ResourceUsage>,
}

impl AppManifest {
    /// Parse and validate a manifest document.
    ///
    /// `default_image` overrides the generated per-proc release image;
    /// `cluster` supplies the registry and routing domains.
    pub fn load(
        meta_yaml: &str,
        meta_version: &str,
        default_image: Option<&str>,
        cluster: &ClusterConfig,
    ) -> ManifestResult<Self> {
        let meta: Value = serde_yaml::from_str(meta_yaml)?;

        let appname = match field(&meta, "appname").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ManifestError::MissingAppName),
        };
        if RESERVED_APPNAMES.contains(&appname.as_str()) {
            return Err(ManifestError::ReservedAppName(appname));
        }
        debug!("loading manifest for app '{}'", appname);

        let procs = Self::load_procs(&meta, &appname, meta_version, default_image, cluster)?;

        let build = match field(&meta, "build") {
            Some(build_meta) => BuildSpec::load(build_meta)?,
            None => {
                return Err(ManifestError::MissingBuildSection(
                    "no build section in manifest".to_string(),
                ))
            }
        };
        let release = match field(&meta, "release") {
            Some(release_meta) => ReleaseSpec::load(release_meta)?,
            None => ReleaseSpec::default(),
        };
        let test = match field(&meta, "test") {
            Some(test_meta) => TestSpec::load(test_meta)?,
            None => TestSpec::default(),
        };

        let notify = field(&meta, "notify")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();
        let use_services = field(&meta, "use_services")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();
        let use_resources = match field(&meta, "use_resources") {
            Some(resources_meta) => Self::load_use_resources(resources_meta)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            appname,
            meta_version: meta_version.to_string(),
            procs,
            build,
            release,
            test,
            notify,
            use_services,
            use_resources,
        })
    }

    /// Look up a proc by name.
    pub fn proc(&self, name: &str) -> Option<&ProcSpec> {
        self.procs.get(name)
    }

    fn load_procs(
        meta: &Value,
        appname: &str,
        meta_version: &str,
        default_image: Option<&str>,
        cluster: &ClusterConfig,
    ) -> ManifestResult<BTreeMap<String, ProcSpec>> {
        let mut procs: BTreeMap<String, ProcSpec> = BTreeMap::new();
        let mut add = |key: &str, body: &Value| -> ManifestResult<()> {
            let proc = ProcSpec::load(key, body, appname, meta_version, default_image, cluster)?;
            if procs.contains_key(&proc.name) {
                return Err(ManifestError::DuplicateProcName(proc.name));
            }
            procs.insert(proc.name.clone(), proc);
            Ok(())
        };

        let Some(mapping) = meta.as_mapping() else {
            return Ok(procs);
        };
        for (key, body) in mapping {
            let Some(key) = key.as_str() else { continue };
            if !is_proc_section(key) {
                continue;
            }
            if let Some(service_name) = key.strip_prefix("service.") {
                let (worker_key, worker_body, portal_key, portal_body) =
                    Self::expand_service(key, service_name, body)?;
                add(&worker_key, &worker_body)?;
                add(&portal_key, &portal_body)?;
            } else {
                add(key, body)?;
            }
        }
        Ok(procs)
    }

    /// Expand `service.<name>` into a worker proc (the section body minus
    /// its `portal` sub-mapping) and a portal proc (that sub-mapping with
    /// `service_name` forced to `<name>`).
    fn expand_service(
        key: &str,
        service_name: &str,
        body: &Value,
    ) -> ManifestResult<(String, Value, String, Value)> {
        if service_name.is_empty() || service_name.contains('.') {
            return Err(ManifestError::InvalidServiceKey {
                key: key.to_string(),
                message: "expected exactly 'service.<name>'".to_string(),
            });
        }
        let mut worker_body = body
            .as_mapping()
            .cloned()
            .ok_or_else(|| ManifestError::InvalidServiceKey {
                key: key.to_string(),
                message: "service section must be a mapping".to_string(),
            })?;
        let portal_value = worker_body
            .remove(Value::String("portal".to_string()))
            .ok_or_else(|| ManifestError::InvalidServiceKey {
                key: key.to_string(),
                message: "service section has no portal sub-section".to_string(),
            })?;
        let mut portal_body =
            portal_value
                .as_mapping()
                .cloned()
                .ok_or_else(|| ManifestError::InvalidServiceKey {
                    key: key.to_string(),
                    message: "portal sub-section must be a mapping".to_string(),
                })?;
        portal_body.insert(
            Value::String("service_name".to_string()),
            Value::String(service_name.to_string()),
        );
        Ok((
            format!("proc.{service_name}"),
            Value::Mapping(worker_body),
            format!("portal.portal-{service_name}"),
            Value::Mapping(portal_body),
        ))
    }

    fn load_use_resources(meta: &Value) -> ManifestResult<BTreeMap<String, ResourceUsage>> {
        let Some(mapping) = meta.as_mapping() else {
            return Ok(BTreeMap::new());
        };
        let mut use_resources = BTreeMap::new();
        for (key, declaration) in mapping {
            let (Some(name), Some(decl)) = (key.as_str(), declaration.as_mapping()) else {
                return Err(ManifestError::InvalidResourceDefinition(raw_snippet(meta)));
            };
            let mut context = decl.clone();
            let services = context
                .remove(Value::String("services".to_string()))
                .ok_or_else(|| ManifestError::InvalidResourceDefinition(raw_snippet(meta)))?;
            if !services.is_sequence() {
                return Err(ManifestError::InvalidResourceDefinition(raw_snippet(meta)));
            }
            use_resources.insert(
                name.to_string(),
                ResourceUsage {
                    services: string_seq(&services),
                    context,
                },
            );
        }
        Ok(use_resources)
    }
}

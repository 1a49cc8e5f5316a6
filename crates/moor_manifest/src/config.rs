//! Cluster-level configuration and container path conventions.

/// Root of the application tree inside a container.
pub const APP_ROOT: &str = "/lain/app";

/// Shared volume injected whenever a proc declares log files.
pub const LOG_VOLUME: &str = "/lain/logs";

/// Read-only bind mounts attached to every proc.
pub const SYSTEM_VOLUMES: [&str; 2] = [
    "/data/lain/entrypoint:/lain/entrypoint:ro",
    "/etc/localtime:/etc/localtime:ro",
];

/// Volume targets no proc may claim: filesystem root, lain root, app root.
pub const FORBIDDEN_VOLUMES: [&str; 3] = ["/", "/lain", APP_ROOT];

/// Application names reserved for system addressing.
pub const RESERVED_APPNAMES: [&str; 3] = ["service", "resource", "portal"];

fn default_registry() -> String {
    "registry.lain.local".to_string()
}

fn default_domain() -> String {
    "lain.local".to_string()
}

/// Cluster-level settings handed to every manifest load by the caller.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Docker registry used for generated image names.
    pub registry: String,
    /// Routing domains used to derive default mountpoints.
    pub domains: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            domains: vec![default_domain()],
        }
    }
}

impl ClusterConfig {
    pub fn new(registry: impl Into<String>, domains: Vec<String>) -> Self {
        Self {
            registry: registry.into(),
            domains,
        }
    }

    /// Set the registry.
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Set the routing domains.
    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }
}

/// Generated image reference for an application build phase.
pub fn default_image_name(appname: &str, phase: &str, meta_version: &str, registry: &str) -> String {
    format!("{registry}/{appname}:{phase}-{meta_version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_image_name() {
        assert_eq!(
            default_image_name("hello", "release", "123-abc", "reg.example.com"),
            "reg.example.com/hello:release-123-abc"
        );
    }

    #[test]
    fn test_cluster_config_builder() {
        let config = ClusterConfig::default()
            .with_registry("reg.local")
            .with_domains(vec!["example.com".to_string()]);
        assert_eq!(config.registry, "reg.local");
        assert_eq!(config.domains, vec!["example.com"]);
    }
}

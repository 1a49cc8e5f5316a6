//! Error types for resource rendering.

use thiserror::Error;

/// Result type alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors that can occur while rendering a resource instance manifest.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("unresolved template variable '{variable}' in '{scalar}'")]
    UnresolvedVariable { variable: String, scalar: String },

    #[error("context variable '{variable}' in '{scalar}' is not a scalar")]
    NonScalarVariable { variable: String, scalar: String },

    #[error("rendered template is not a manifest mapping")]
    NotAMapping,

    #[error("manifest error: {0}")]
    Manifest(#[from] moor_manifest::ManifestError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

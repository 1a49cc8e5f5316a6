//! Error types for manifest resolution.

use thiserror::Error;

/// Result type alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while loading a deployment manifest.
///
/// Every failure aborts the whole load; no partial manifest is returned.
/// Variants carry the offending section key and raw value where one exists.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest has no appname")]
    MissingAppName,

    #[error("appname '{0}' is reserved")]
    ReservedAppName(String),

    #[error("duplicated proc name '{0}'")]
    DuplicateProcName(String),

    #[error("invalid service section key '{key}': {message}")]
    InvalidServiceKey { key: String, message: String },

    #[error("unsupported port descriptor: {0}")]
    UnsupportedPortDescriptor(String),

    #[error("proc '{key}' is web-kind but not named 'web' and declares no mountpoint: {body}")]
    MissingMountpoint { key: String, body: String },

    #[error("invalid volume in proc '{key}': resolved path '{volume}' is a reserved location")]
    InvalidVolume { key: String, volume: String },

    #[error("log path in proc '{key}' must be relative to the log root, got '{path}'")]
    AbsoluteLogPath { key: String, path: String },

    #[error("proc '{key}' is portal-kind but declares no service_name: {body}")]
    MissingServiceName { key: String, body: String },

    #[error("invalid prepare version '{0}': must match ^[a-zA-Z0-9]+$")]
    InvalidPrepareVersion(String),

    #[error("invalid build section: {0}")]
    MissingBuildSection(String),

    #[error("invalid resource definition: {0}")]
    InvalidResourceDefinition(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Render a raw document value into a one-line diagnostic snippet.
pub(crate) fn raw_snippet(value: &serde_yaml::Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(text) => text.trim_end().replace('\n', " | "),
        Err(_) => format!("{value:?}"),
    }
}

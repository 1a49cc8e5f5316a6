//! # moor_manifest
//!
//! Deployment-manifest resolution for the moor orchestrator.
//!
//! A manifest is a YAML document describing one application's build,
//! release, test, and process topology. This crate parses it into a
//! validated in-memory model: typed proc specifications with derived
//! routing, port, volume, and backup metadata, plus the build pipeline
//! sections. Callers hand in document text and take back the model; all
//! I/O, registry lookups, and orchestration calls stay outside.
//!
//! ## Example
//!
//! ```rust
//! use moor_manifest::{AppManifest, ClusterConfig};
//!
//! let yaml = r#"
//! appname: hello
//! build:
//!   base: golang:1.21
//!   script:
//!     - make
//! web:
//!   cmd: ./hello
//! "#;
//!
//! let cluster = ClusterConfig::default();
//! let manifest = AppManifest::load(yaml, "123-abc", None, &cluster).unwrap();
//! assert_eq!(manifest.procs["web"].mountpoint, vec!["hello.lain.local", "hello.lain"]);
//! ```

pub mod build;
pub mod config;
pub mod error;
pub mod manifest;
pub mod path;
pub mod port;
pub mod proc;
mod value;

pub use build::{BuildSpec, CopyRule, PrepareSpec, ReleaseSpec, TestSpec};
pub use config::{default_image_name, ClusterConfig};
pub use error::{ManifestError, ManifestResult};
pub use manifest::{AppManifest, ResourceUsage};
pub use port::{PortSpec, Protocol};
pub use proc::{is_proc_section, BackupEntry, BackupMode, ProcKind, ProcSpec};

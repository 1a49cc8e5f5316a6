//! # moor_resource
//!
//! Resource-manifest rendering for the moor orchestrator.
//!
//! A resource is a templated application manifest published once and
//! instantiated per consuming application. This crate renders the
//! template with the consumer's `use_resources` context, validates the
//! result through `moor_manifest`, and re-addresses it as a named
//! resource instance.
//!
//! ## Example
//!
//! ```rust
//! use moor_manifest::ClusterConfig;
//! use moor_resource::render_instance;
//!
//! let template = r#"
//! appname: redis
//! apptype: resource
//! build:
//!   base: redis:7
//! worker.redis:
//!   memory: "{{memory}}"
//! "#;
//!
//! let context: serde_yaml::Mapping = serde_yaml::from_str("memory: 64m").unwrap();
//! let instance = render_instance(
//!     "redis",
//!     "1-abc",
//!     template,
//!     "hello",
//!     &context,
//!     &ClusterConfig::default(),
//! )
//! .unwrap();
//! assert!(instance.contains("appname: resource.redis.hello"));
//! assert!(!instance.contains("apptype"));
//! ```

pub mod error;
pub mod instance;
pub mod renderer;

pub use error::{ResourceError, ResourceResult};
pub use instance::{instance_name, render_instance};
pub use renderer::ResourceRenderer;

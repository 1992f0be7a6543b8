//! # loam-config
//!
//! Build option surface and layered configuration resolution for loam.
//!
//! Options resolve through three explicit layers, lowest precedence first:
//! built-in defaults, the config file (optional explicit path), and
//! programmatic overrides. The merged document deserializes into one
//! [`BuildOptions`] value; downstream code never re-checks defaults.
//!
//! ## Quick Start
//!
//! ```
//! use loam_config::resolve_config;
//! use loam_pipeline::RunMode;
//! use serde_json::json;
//!
//! let config = resolve_config(
//!     json!({ "outDir": "build", "sourcemap": true }),
//!     RunMode::Build,
//!     None,
//! )
//! .unwrap();
//!
//! assert_eq!(config.options.entry, "index.html");
//! assert_eq!(config.options.base, "/");
//! assert!(config.options.sourcemap);
//! ```

pub mod error;
pub mod options;
pub mod resolve;

pub use error::{ConfigError, Result};
pub use options::{BuildOptions, Minifier, PassthroughOptions, normalize_base};
pub use resolve::{PluginBuckets, ResolvedConfig, resolve_config};

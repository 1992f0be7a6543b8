//! # loam-build
//!
//! Production build driver and bundler-backend boundary for loam.
//!
//! The driver sequences one build invocation: resolve options, assemble
//! the plugin pipeline, hand it to the external bundler backend, manage
//! the output directory, and track concurrent-build lifecycle so backend
//! handles are released exactly once per idle period.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use loam_build::BuildDriver;
//! use serde_json::json;
//!
//! # async fn example(backend: Arc<dyn loam_build::BundlerBackend>) {
//! let driver = BuildDriver::new(backend);
//! driver
//!     .build(json!({ "outDir": "dist", "sourcemap": true }), None)
//!     .await
//!     .expect("build failed");
//! # }
//! ```

pub mod backend;
pub mod driver;
pub mod session;

pub use backend::{
    BackendError, BackendInput, BackendHandle, BundlerBackend, EmittedFile, GeneratedBundle,
    ModuleFormat, OutputOptions, SharedHandle, SideEffects, TreeShakePolicy,
};
pub use driver::{BuildDriver, BuildError, BuildOutcome};
pub use session::BuildSession;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

/// Result type alias for loam-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

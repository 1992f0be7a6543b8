//! # loam-pipeline
//!
//! Plugin model, pipeline assembly, and hook scheduling for loam.
//!
//! A build run is described by a [`PipelineManifest`]: the final, totally
//! ordered list of plugins for that run. Manifests are assembled once from a
//! fixed stage template plus the user's plugin buckets, and are immutable
//! afterwards; hook callers extract stably ordered handler lists from them
//! through the scheduling API.
//!
//! ## Quick Start
//!
//! ```
//! use loam_pipeline::{
//!     HookOrder, PipelineFlags, PipelineSpec, PluginDescriptor, RunMode, assemble,
//! };
//!
//! let report = PluginDescriptor::new("report")
//!     .with_ordered_hook("buildEnd", HookOrder::Post, |_cx| Ok(()))
//!     .into_shared();
//!
//! let manifest = assemble(&PipelineSpec {
//!     mode: RunMode::Build,
//!     flags: PipelineFlags::default(),
//!     user_pre: &[],
//!     user_normal: &[report],
//!     user_post: &[],
//!     build_stages: None,
//! });
//!
//! for plugin in manifest.sorted_plugins("buildEnd").iter() {
//!     println!("buildEnd: {}", plugin.name());
//! }
//! ```

pub mod assemble;
pub mod plugin;
pub mod schedule;

pub use assemble::{BuildStageProvider, PipelineFlags, PipelineSpec, RunMode, assemble};
pub use plugin::{
    HookContext, HookHandler, HookImpl, HookOrder, PluginDescriptor, SharedPlugin, handler_of,
};
pub use schedule::PipelineManifest;

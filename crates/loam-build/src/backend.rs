//! The external bundler backend boundary.
//!
//! The backend owns module-graph construction, chunking, and tree-shaking;
//! this crate only describes what crosses the boundary: the bundle input,
//! the output options, and the handle lifecycle.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use loam_pipeline::PipelineManifest;

/// Output module format. The driver always emits native modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleFormat {
    #[default]
    Esm,
}

/// Side-effect assumptions the backend may tree-shake under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideEffects {
    /// Every module may have side effects.
    All,
    /// Only first-party modules may have side effects.
    #[default]
    NoExternal,
}

/// Tree-shaking policy forwarded to the backend.
#[derive(Debug, Clone, Copy)]
pub struct TreeShakePolicy {
    pub enabled: bool,
    pub module_side_effects: SideEffects,
}

impl Default for TreeShakePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            module_side_effects: SideEffects::NoExternal,
        }
    }
}

/// Everything the backend needs to produce an in-memory build graph.
pub struct BackendInput {
    /// Entry point, relative to the project root.
    pub entry: String,
    /// The assembled plugin pipeline for this run.
    pub pipeline: Arc<PipelineManifest>,
    pub treeshake: TreeShakePolicy,
    /// User passthrough options, forwarded verbatim.
    pub passthrough: Value,
}

/// Output options for one write or generate call.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub dir: PathBuf,
    pub format: ModuleFormat,
    pub sourcemap: bool,
    /// Filename template for entry chunks.
    pub entry_file_names: String,
    /// Filename template for secondary chunks.
    pub chunk_file_names: String,
    /// Filename template for non-script assets.
    pub asset_file_names: String,
    /// Force the module-shape marker on generated output for interop.
    pub esmodule_marker: bool,
    /// User passthrough output options; highest precedence.
    pub passthrough: Value,
}

/// One emitted chunk or asset from an in-memory generate.
#[derive(Debug, Clone)]
pub struct EmittedFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// The in-memory result of a generate call.
#[derive(Debug, Clone, Default)]
pub struct GeneratedBundle {
    pub files: Vec<EmittedFile>,
}

/// A live build graph produced by the backend.
#[async_trait]
pub trait BackendHandle: Send + Sync {
    /// Write the bundle to disk under the output options.
    async fn write(&self, options: &OutputOptions) -> Result<(), BackendError>;

    /// Generate the bundle in memory.
    async fn generate(&self, options: &OutputOptions) -> Result<GeneratedBundle, BackendError>;

    /// Release the graph. Called by the session at idle, not per build.
    async fn close(&self) -> Result<(), BackendError>;
}

pub type SharedHandle = Arc<dyn BackendHandle>;

/// The external bundler backend.
#[async_trait]
pub trait BundlerBackend: Send + Sync {
    async fn bundle(&self, input: BackendInput) -> Result<SharedHandle, BackendError>;
}

/// A bundling failure with optional plugin and source attribution.
#[derive(Debug, Clone)]
pub struct BackendError {
    pub message: String,
    /// Name of the plugin the failure is attributed to.
    pub plugin: Option<String>,
    /// Module id the failure points at.
    pub id: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Source excerpt around the failure.
    pub frame: Option<String>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            plugin: None,
            id: None,
            line: None,
            column: None,
            frame: None,
        }
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_location(mut self, id: impl Into<String>, line: u32, column: u32) -> Self {
        self.id = Some(id.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(plugin) = &self.plugin {
            write!(f, "[{plugin}] ")?;
        }
        f.write_str(&self.message)?;
        if let Some(id) = &self.id {
            write!(f, " ({id}")?;
            if let (Some(line), Some(column)) = (self.line, self.column) {
                write!(f, ":{line}:{column}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl std::error::Error for BackendError {}

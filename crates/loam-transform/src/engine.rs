//! The transform engine boundary and per-file transform orchestration.

use thiserror::Error;

use crate::options::{TransformDirective, TransformOptions};
use crate::resolve::resolve_directive;
use crate::settings::{SettingsError, SettingsSource, WatchRegistry};
use crate::sourcemap::{SourceMap, chain_maps};

/// One diagnostic reported by the engine.
#[derive(Debug, Clone)]
pub struct EngineDiagnostic {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Raw engine output for one file.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub code: String,
    pub map: Option<SourceMap>,
    pub errors: Vec<EngineDiagnostic>,
}

/// The external source-to-target transform engine.
pub trait TransformEngine {
    fn transform(
        &self,
        filename: &str,
        source: &str,
        directive: &TransformDirective,
    ) -> EngineOutput;
}

#[derive(Debug, Error)]
pub enum TransformError {
    /// The engine reported diagnostics; the first message is surfaced.
    #[error("transform of {filename} failed: {message}")]
    Engine { filename: String, message: String },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Successful transform of one file.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Resolve the directive for `filename` and run the engine over `source`.
///
/// When an input map is supplied, the engine map's embedded source
/// contents are cleared (the input map already carries the originals) and
/// the two maps chain into one; otherwise the engine map passes through
/// unchanged.
pub fn transform(
    engine: &dyn TransformEngine,
    filename: &str,
    source: &str,
    options: Option<&TransformOptions>,
    input_map: Option<&SourceMap>,
    settings: &dyn SettingsSource,
    watcher: Option<&dyn WatchRegistry>,
) -> Result<TransformResult, TransformError> {
    let directive = resolve_directive(filename, options, settings, watcher)?;
    let output = engine.transform(filename, source, &directive);

    if let Some(first) = output.errors.first() {
        return Err(TransformError::Engine {
            filename: filename.to_string(),
            message: first.message.clone(),
        });
    }

    let map = match (output.map, input_map) {
        (Some(mut engine_map), Some(input)) => {
            engine_map.sources_content = None;
            Some(chain_maps(&engine_map, input))
        }
        (engine_map, _) => engine_map,
    };

    Ok(TransformResult {
        code: output.code,
        map,
    })
}

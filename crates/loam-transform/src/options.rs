//! Per-call transform options and the normalized per-file directive.

use rustc_hash::FxHashMap;

use crate::dialect::Dialect;

/// JSX transform runtime selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsxRuntime {
    /// Pragma calls (`React.createElement`).
    Classic,
    /// Imported jsx runtime functions.
    Automatic,
}

/// JSX handling, all fields optional; unset fields defer to project
/// settings, then to the engine default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsxSpec {
    pub runtime: Option<JsxRuntime>,
    pub development: Option<bool>,
    pub pragma: Option<String>,
    pub pragma_fragment: Option<String>,
    pub import_source: Option<String>,
}

/// Explicit per-call transform options.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Dialect override; when unset the filename extension decides.
    pub lang: Option<Dialect>,

    /// Source map emission; defaults to enabled.
    pub sourcemap: Option<bool>,

    pub jsx: JsxSpec,

    /// Code injected before the module source.
    pub prologue: Option<String>,

    /// Compile-time constant substitutions.
    pub define: FxHashMap<String, String>,
}

/// The normalized configuration handed to the transform engine for one
/// file. Exactly one dialect is always selected; nothing here is
/// ambiguous for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformDirective {
    pub dialect: Dialect,
    pub jsx: JsxSpec,

    /// Whether type-only imports are stripped. `None` defers to the
    /// engine's own default.
    pub strip_type_imports: Option<bool>,

    pub sourcemap: bool,
    pub prologue: Option<String>,
    pub define: FxHashMap<String, String>,
}

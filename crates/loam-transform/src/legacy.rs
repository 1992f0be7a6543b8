//! Migration adapter for the pre-unification option surface.
//!
//! Older configs drove the transform with a flat flag set; this maps it to
//! [`TransformOptions`]. Flags with no equivalent warn and drop, never
//! fail.

use rustc_hash::FxHashMap;

use crate::dialect::Dialect;
use crate::options::{JsxRuntime, TransformOptions};

/// The older option surface accepted for migration.
#[derive(Debug, Clone, Default)]
pub struct LegacyOptions {
    /// Jsx mode tag: `automatic`, `transform`, or `preserve`.
    pub jsx: Option<String>,
    pub jsx_dev: Option<bool>,
    pub jsx_factory: Option<String>,
    pub jsx_fragment: Option<String>,
    pub jsx_import_source: Option<String>,
    pub define: FxHashMap<String, String>,
    /// Loader tag; only the four dialect tags have an equivalent.
    pub loader: Option<String>,
    pub sourcemap: Option<SourcemapFlag>,
}

/// The older sourcemap flag: a boolean or a mode tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcemapFlag {
    Enabled(bool),
    External,
    Linked,
    Other(String),
}

/// Map the older option surface to the unified one.
pub fn from_legacy_options(legacy: &LegacyOptions) -> TransformOptions {
    let mut options = TransformOptions::default();

    match legacy.jsx.as_deref() {
        Some("automatic") => options.jsx.runtime = Some(JsxRuntime::Automatic),
        Some("transform") => options.jsx.runtime = Some(JsxRuntime::Classic),
        Some(other) => {
            tracing::warn!(jsx = other, "jsx mode has no equivalent; option dropped");
        }
        None => {}
    }

    options.jsx.development = legacy.jsx_dev;
    options.jsx.pragma = legacy.jsx_factory.clone();
    options.jsx.pragma_fragment = legacy.jsx_fragment.clone();
    options.jsx.import_source = legacy.jsx_import_source.clone();
    options.define = legacy.define.clone();

    if let Some(loader) = legacy.loader.as_deref() {
        match loader {
            "js" | "jsx" | "ts" | "tsx" => options.lang = Some(Dialect::from_tag(loader)),
            other => {
                tracing::warn!(loader = other, "loader has no equivalent dialect; option dropped");
            }
        }
    }

    match &legacy.sourcemap {
        Some(SourcemapFlag::Enabled(value)) => options.sourcemap = Some(*value),
        Some(SourcemapFlag::External) => options.sourcemap = Some(true),
        // The engine has no linked mode; dropped without a warning.
        Some(SourcemapFlag::Linked) => {}
        Some(SourcemapFlag::Other(value)) => {
            tracing::warn!(sourcemap = %value, "unsupported sourcemap mode; option dropped");
        }
        None => {}
    }

    options
}

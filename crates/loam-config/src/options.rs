//! The build option surface and its documented defaults.

use std::path::PathBuf;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use loam_pipeline::PipelineFlags;

// Helper defaults
fn default_entry() -> String {
    "index.html".to_string()
}

fn default_base() -> String {
    "/".to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_inline_limit() -> u64 {
    4096
}

fn default_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_public_dir() -> Option<PathBuf> {
    Some(PathBuf::from("public"))
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Fully-defaulted options for one build invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Entry point, resolved against `root`.
    pub entry: String,

    /// Public base path; always normalized to end with exactly one `/`.
    pub base: String,

    /// Output directory, resolved against `root`.
    pub out_dir: PathBuf,

    /// Directory under `out_dir` that hashed chunks and assets nest in.
    pub assets_dir: PathBuf,

    /// Assets below this byte size are inlined instead of emitted.
    pub assets_inline_limit: u64,

    /// Emit one stylesheet per async chunk instead of a single bundle.
    pub css_code_split: bool,

    /// Emit source maps for the build output.
    pub sourcemap: bool,

    /// Minifier applied to emitted chunks.
    pub minify: Minifier,

    /// Options forwarded verbatim to the terser stage.
    pub terser_options: Value,

    /// Build for server-side rendering.
    pub ssr: bool,

    /// Options forwarded verbatim to the bundler backend.
    pub bundler_options: PassthroughOptions,

    /// Write the output to disk; when false, generate in memory.
    pub write: bool,

    /// Emit the HTML entry into the output directory.
    pub emit_index: bool,

    /// Emit static assets into the output directory.
    pub emit_assets: bool,

    /// Emit a manifest mapping source files to hashed output names.
    pub emit_manifest: bool,

    /// Static-assets directory copied verbatim into `out_dir`, when present.
    pub public_dir: Option<PathBuf>,

    /// Project root all relative paths resolve against.
    pub root: PathBuf,

    /// Inject the module-preload polyfill stage into the pipeline.
    pub module_preload_polyfill: bool,

    /// Prefer the native implementation of paired built-in stages.
    pub native_pipeline: bool,

    /// Enable dependency pre-optimization in serve mode.
    pub optimize_deps: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            base: default_base(),
            out_dir: default_out_dir(),
            assets_dir: default_assets_dir(),
            assets_inline_limit: default_inline_limit(),
            css_code_split: true,
            sourcemap: false,
            minify: Minifier::default(),
            terser_options: default_object(),
            ssr: false,
            bundler_options: PassthroughOptions::default(),
            write: true,
            emit_index: true,
            emit_assets: true,
            emit_manifest: false,
            public_dir: default_public_dir(),
            root: default_root(),
            module_preload_polyfill: true,
            native_pipeline: false,
            optimize_deps: true,
        }
    }
}

impl BuildOptions {
    /// The pipeline toggles derived from these options.
    pub fn pipeline_flags(&self) -> PipelineFlags {
        PipelineFlags {
            native_stages: self.native_pipeline,
            module_preload_polyfill: self.module_preload_polyfill,
            dep_optimization: self.optimize_deps,
        }
    }
}

/// Backend passthrough options, split into the bundle and output halves.
///
/// The output half has the highest precedence among output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassthroughOptions {
    pub bundle: Value,
    pub output: Value,
}

impl Default for PassthroughOptions {
    fn default() -> Self {
        Self {
            bundle: default_object(),
            output: default_object(),
        }
    }
}

/// Minifier choice: `false`, `"terser"`, or `"native"` in config form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Minifier {
    Off,
    #[default]
    Terser,
    Native,
}

impl Serialize for Minifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Minifier::Off => serializer.serialize_bool(false),
            Minifier::Terser => serializer.serialize_str("terser"),
            Minifier::Native => serializer.serialize_str("native"),
        }
    }
}

impl<'de> Deserialize<'de> for Minifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MinifierVisitor;

        impl Visitor<'_> for MinifierVisitor {
            type Value = Minifier;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a boolean, \"terser\", or \"native\"")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<Minifier, E> {
                Ok(if value { Minifier::Terser } else { Minifier::Off })
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Minifier, E> {
                match value {
                    "terser" => Ok(Minifier::Terser),
                    "native" => Ok(Minifier::Native),
                    "off" => Ok(Minifier::Off),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(MinifierVisitor)
    }
}

/// Normalize a public base path to end with exactly one trailing `/`.
pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("{trimmed}/")
    }
}

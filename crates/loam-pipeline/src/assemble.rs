//! Pipeline assembly: turning run-mode flags and user plugin buckets into
//! the final ordered manifest.
//!
//! The stage template below is a contract the rest of the system depends
//! on: resolution runs before the style and language transforms, style
//! processing runs before style post-processing, and the server-only
//! analysis stages run last and only outside build mode.

use crate::plugin::{PluginDescriptor, SharedPlugin};
use crate::schedule::PipelineManifest;

/// The mode a pipeline is assembled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One-shot production build.
    Build,
    /// Dev-server run; enables the serve-only and analysis stages.
    Serve,
}

/// Feature toggles that gate optional pipeline slots.
#[derive(Debug, Clone, Copy)]
pub struct PipelineFlags {
    /// Select the native member of every mutually exclusive built-in pair.
    pub native_stages: bool,
    /// Inject the module-preload polyfill stage.
    pub module_preload_polyfill: bool,
    /// Enable the dependency-optimization gate (serve mode only).
    pub dep_optimization: bool,
}

impl Default for PipelineFlags {
    fn default() -> Self {
        Self {
            native_stages: false,
            module_preload_polyfill: true,
            dep_optimization: true,
        }
    }
}

/// Supplies the extra build-only stages spliced into the manifest.
///
/// The `pre` list lands immediately before the dynamic-import-variable
/// slot; the `post` list lands immediately after the user post bucket.
pub trait BuildStageProvider: Send + Sync {
    fn pre_stages(&self) -> Vec<SharedPlugin>;
    fn post_stages(&self) -> Vec<SharedPlugin>;
}

/// Inputs to one pipeline assembly.
pub struct PipelineSpec<'a> {
    pub mode: RunMode,
    pub flags: PipelineFlags,
    pub user_pre: &'a [SharedPlugin],
    pub user_normal: &'a [SharedPlugin],
    pub user_post: &'a [SharedPlugin],
    pub build_stages: Option<&'a dyn BuildStageProvider>,
}

/// Which member of a mutually exclusive built-in pair fills a slot.
///
/// Resolved once per assembly from the global flag, never re-branched at
/// call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageImpl {
    Native,
    Portable,
}

impl StageImpl {
    fn select(native: bool) -> Self {
        if native {
            StageImpl::Native
        } else {
            StageImpl::Portable
        }
    }
}

fn stage(name: &str) -> SharedPlugin {
    PluginDescriptor::new(name).into_shared()
}

fn gate(enabled: bool, name: &str) -> Option<SharedPlugin> {
    enabled.then(|| stage(name))
}

fn pick(selector: StageImpl, portable: &str, native: &str) -> SharedPlugin {
    match selector {
        StageImpl::Portable => stage(portable),
        StageImpl::Native => stage(native),
    }
}

/// Assemble the ordered plugin manifest for one run.
///
/// Pure given its inputs: identical specs produce manifests with identical
/// stage ordering, and toggling the native flag swaps which member of a
/// pair appears without moving its slot.
pub fn assemble(spec: &PipelineSpec<'_>) -> PipelineManifest {
    let build = spec.mode == RunMode::Build;
    let selector = StageImpl::select(spec.flags.native_stages);

    let (extra_pre, extra_post) = match (build, spec.build_stages) {
        (true, Some(provider)) => (provider.pre_stages(), provider.post_stages()),
        _ => (Vec::new(), Vec::new()),
    };

    let mut slots: Vec<Option<SharedPlugin>> = Vec::new();

    slots.push(gate(
        !build && spec.flags.dep_optimization,
        "loam:optimizer-gate",
    ));
    slots.push(Some(stage("loam:build-metadata")));
    slots.push(Some(stage("loam:package-watch")));
    slots.push(gate(!build, "loam:pre-alias"));
    slots.push(Some(pick(selector, "loam:alias", "loam:native-alias")));

    slots.extend(spec.user_pre.iter().cloned().map(Some));

    slots.push(if spec.flags.module_preload_polyfill {
        Some(pick(
            selector,
            "loam:modulepreload-polyfill",
            "loam:native-modulepreload-polyfill",
        ))
    } else {
        None
    });
    slots.push(Some(stage("loam:resolve")));
    slots.push(Some(stage("loam:inline-proxy")));
    slots.push(Some(stage("loam:styles")));
    slots.push(Some(stage("loam:transform")));
    slots.push(Some(pick(
        selector,
        "loam:data-import",
        "loam:native-data-import",
    )));
    slots.push(Some(pick(
        selector,
        "loam:binary-helper",
        "loam:native-binary-helper",
    )));
    slots.push(Some(stage("loam:worker")));
    slots.push(Some(stage("loam:assets")));

    slots.extend(spec.user_normal.iter().cloned().map(Some));

    slots.push(Some(pick(
        selector,
        "loam:binary-fallback",
        "loam:native-binary-fallback",
    )));
    slots.push(Some(stage("loam:define")));
    slots.push(Some(stage("loam:styles-post")));
    slots.push(gate(build, "loam:html"));
    slots.push(Some(stage("loam:worker-url")));
    slots.push(Some(stage("loam:asset-url")));

    slots.extend(extra_pre.into_iter().map(Some));

    slots.push(Some(pick(
        selector,
        "loam:dynamic-import-vars",
        "loam:native-dynamic-import-vars",
    )));
    slots.push(Some(pick(
        selector,
        "loam:glob-import",
        "loam:native-glob-import",
    )));

    slots.extend(spec.user_post.iter().cloned().map(Some));
    slots.extend(extra_post.into_iter().map(Some));

    if !build {
        slots.push(Some(stage("loam:client-inject")));
        slots.push(Some(stage("loam:style-analysis")));
        slots.push(Some(stage("loam:import-analysis")));
    }

    PipelineManifest::new(slots.into_iter().flatten().collect())
}

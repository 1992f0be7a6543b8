//! The production build driver.
//!
//! One `build` call sequences option resolution, pipeline assembly,
//! backend invocation, output-directory lifecycle, and emission. The
//! session exit path runs on every outcome, so backend teardown never
//! leaks across overlapping invocations.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use serde_json::Value;
use thiserror::Error;

use loam_config::{BuildOptions, ConfigError, Minifier, PluginBuckets, resolve_config};
use loam_pipeline::{
    BuildStageProvider, PipelineManifest, PipelineSpec, PluginDescriptor, RunMode, assemble,
};

use crate::backend::{
    BackendError, BackendInput, BundlerBackend, GeneratedBundle, ModuleFormat, OutputOptions,
    TreeShakePolicy,
};
use crate::session::BuildSession;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("invalid output directory: {0}")]
    InvalidOutDir(PathBuf),

    #[error("output directory I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What one successful build produced.
#[derive(Debug)]
pub enum BuildOutcome {
    /// Output written to the output directory.
    Written,
    /// Output generated in memory (`write: false`).
    Generated(GeneratedBundle),
}

/// Drives production builds against one bundler backend.
///
/// Cheap to share; concurrent `build` calls on one driver coordinate
/// through the shared [`BuildSession`].
pub struct BuildDriver {
    backend: Arc<dyn BundlerBackend>,
    session: Arc<BuildSession>,
    plugins: PluginBuckets,
    build_stages: Option<Arc<dyn BuildStageProvider>>,
}

impl BuildDriver {
    pub fn new(backend: Arc<dyn BundlerBackend>) -> Self {
        Self {
            backend,
            session: Arc::new(BuildSession::new()),
            plugins: PluginBuckets::default(),
            build_stages: None,
        }
    }

    /// Share a session across drivers (one teardown per process-wide idle).
    pub fn with_session(mut self, session: Arc<BuildSession>) -> Self {
        self.session = session;
        self
    }

    /// Attach the user plugin buckets.
    pub fn with_plugins(mut self, plugins: PluginBuckets) -> Self {
        self.plugins = plugins;
        self
    }

    /// Attach the provider of build-only extra stages.
    pub fn with_build_stages(mut self, provider: Arc<dyn BuildStageProvider>) -> Self {
        self.build_stages = Some(provider);
        self
    }

    pub fn session(&self) -> &Arc<BuildSession> {
        &self.session
    }

    /// Run one production build to completion.
    ///
    /// Rejects with the underlying error after logging it. The session
    /// exit path runs regardless of outcome.
    pub async fn build(
        &self,
        overrides: Value,
        config_path: Option<&Path>,
    ) -> Result<BuildOutcome, BuildError> {
        self.session.enter();
        let result = self.run(overrides, config_path).await;
        self.session.exit().await;
        result
    }

    async fn run(
        &self,
        overrides: Value,
        config_path: Option<&Path>,
    ) -> Result<BuildOutcome, BuildError> {
        let config = resolve_config(overrides, RunMode::Build, config_path)?
            .with_plugins(self.plugins.clone());
        let options = &config.options;

        tracing::debug!(
            entry = %options.entry,
            out_dir = %options.out_dir.display(),
            "build started"
        );

        let assembled = assemble(&PipelineSpec {
            mode: RunMode::Build,
            flags: options.pipeline_flags(),
            user_pre: &config.plugins.pre,
            user_normal: &config.plugins.normal,
            user_post: &config.plugins.post,
            build_stages: self.build_stages.as_deref(),
        });
        let pipeline = Arc::new(finalize_pipeline(assembled, options));

        let input = BackendInput {
            entry: options.entry.clone(),
            pipeline,
            treeshake: TreeShakePolicy::default(),
            passthrough: options.bundler_options.bundle.clone(),
        };

        let handle = match self.backend.bundle(input).await {
            Ok(handle) => handle,
            Err(err) => {
                report_backend_error(&err);
                return Err(err.into());
            }
        };
        self.session.register(Arc::clone(&handle));

        let out_dir = resolve_out_dir(options)?;
        if options.write {
            let public = options.public_dir.as_ref().map(|dir| options.root.join(dir));
            if let Err(err) = prepare_out_dir(&out_dir, public.as_deref()).await {
                tracing::error!(
                    "failed to prepare output directory {}: {err}",
                    out_dir.display()
                );
                return Err(err.into());
            }
        }

        let output_options = output_options_for(options, &out_dir);
        let outcome = if options.write {
            match handle.write(&output_options).await {
                Ok(()) => BuildOutcome::Written,
                Err(err) => {
                    report_backend_error(&err);
                    return Err(err.into());
                }
            }
        } else {
            match handle.generate(&output_options).await {
                Ok(bundle) => BuildOutcome::Generated(bundle),
                Err(err) => {
                    report_backend_error(&err);
                    return Err(err.into());
                }
            }
        };

        tracing::debug!("build finished");
        Ok(outcome)
    }
}

/// Append the minifier and manifest-emission stages the resolved options
/// ask for. The assembled manifest is reused untouched when neither
/// applies.
fn finalize_pipeline(manifest: PipelineManifest, options: &BuildOptions) -> PipelineManifest {
    let minify_stage = match options.minify {
        Minifier::Terser => Some("loam:terser"),
        Minifier::Native => Some("loam:native-minify"),
        Minifier::Off => None,
    };

    if minify_stage.is_none() && !options.emit_manifest {
        return manifest;
    }

    let mut plugins = manifest.plugins().to_vec();
    if let Some(name) = minify_stage {
        plugins.push(PluginDescriptor::new(name).into_shared());
    }
    if options.emit_manifest {
        plugins.push(PluginDescriptor::new("loam:manifest").into_shared());
    }
    PipelineManifest::new(plugins)
}

fn resolve_out_dir(options: &BuildOptions) -> Result<PathBuf, BuildError> {
    let dir = options.root.join(&options.out_dir).clean();
    if dir.as_os_str().is_empty() || dir == Path::new("/") || dir == Path::new(".") {
        return Err(BuildError::InvalidOutDir(dir));
    }
    Ok(dir)
}

fn output_options_for(options: &BuildOptions, out_dir: &Path) -> OutputOptions {
    let assets = options.assets_dir.to_string_lossy();
    OutputOptions {
        dir: out_dir.to_path_buf(),
        format: ModuleFormat::Esm,
        sourcemap: options.sourcemap,
        entry_file_names: format!("{assets}/[name].[hash].js"),
        chunk_file_names: format!("{assets}/[name].[hash].js"),
        asset_file_names: format!("{assets}/[name].[hash].[ext]"),
        esmodule_marker: true,
        passthrough: options.bundler_options.output.clone(),
    }
}

/// Clear stale output contents, then copy the static-assets directory in
/// verbatim when one exists. The directory itself is kept in place so
/// open file handles on it stay valid.
async fn prepare_out_dir(out_dir: &Path, public_dir: Option<&Path>) -> std::io::Result<()> {
    clear_dir_contents(out_dir).await?;
    if let Some(public) = public_dir {
        if public.is_dir() {
            copy_dir_recursive(public, out_dir).await?;
        }
    }
    Ok(())
}

async fn clear_dir_contents(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        return tokio::fs::create_dir_all(dir).await;
    }
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            tokio::fs::remove_dir_all(entry.path()).await?;
        } else {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

async fn copy_dir_recursive(from: &Path, to: &Path) -> std::io::Result<()> {
    let mut stack = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = stack.pop() {
        tokio::fs::create_dir_all(&dst).await?;
        let mut entries = tokio::fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let target = dst.join(entry.file_name());
            if file_type.is_dir() {
                stack.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
            }
        }
    }
    Ok(())
}

/// One structured error line: plugin attribution, message, source
/// location, and frame excerpt when available.
fn report_backend_error(err: &BackendError) {
    let mut line = String::new();
    if let Some(plugin) = &err.plugin {
        let _ = write!(line, "[{plugin}] ");
    }
    line.push_str(&err.message);
    if let Some(id) = &err.id {
        let _ = write!(line, "\nfile: {id}");
        if let (Some(l), Some(c)) = (err.line, err.column) {
            let _ = write!(line, ":{l}:{c}");
        }
    }
    if let Some(frame) = &err.frame {
        let _ = write!(line, "\n{frame}");
    }
    tracing::error!("{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_templates_nest_under_the_assets_dir() {
        let options = BuildOptions::default();
        let output = output_options_for(&options, Path::new("dist"));

        assert_eq!(output.entry_file_names, "assets/[name].[hash].js");
        assert_eq!(output.chunk_file_names, "assets/[name].[hash].js");
        assert_eq!(output.asset_file_names, "assets/[name].[hash].[ext]");
        assert!(output.esmodule_marker);
        assert_eq!(output.format, ModuleFormat::Esm);
    }

    #[test]
    fn minify_and_manifest_stages_append_in_order() {
        let options = BuildOptions {
            emit_manifest: true,
            ..BuildOptions::default()
        };
        let manifest = finalize_pipeline(PipelineManifest::new(Vec::new()), &options);
        let names: Vec<&str> = manifest.plugins().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["loam:terser", "loam:manifest"]);

        let options = BuildOptions {
            minify: Minifier::Off,
            ..BuildOptions::default()
        };
        let manifest = finalize_pipeline(PipelineManifest::new(Vec::new()), &options);
        assert!(manifest.is_empty());

        let options = BuildOptions {
            minify: Minifier::Native,
            ..BuildOptions::default()
        };
        let manifest = finalize_pipeline(PipelineManifest::new(Vec::new()), &options);
        let names: Vec<&str> = manifest.plugins().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["loam:native-minify"]);
    }

    #[test]
    fn suspicious_out_dirs_are_rejected() {
        let options = BuildOptions {
            out_dir: PathBuf::from("."),
            ..BuildOptions::default()
        };
        assert!(matches!(
            resolve_out_dir(&options),
            Err(BuildError::InvalidOutDir(_))
        ));

        let options = BuildOptions {
            root: PathBuf::from("/"),
            out_dir: PathBuf::from("dist/.."),
            ..BuildOptions::default()
        };
        assert!(matches!(
            resolve_out_dir(&options),
            Err(BuildError::InvalidOutDir(_))
        ));

        let options = BuildOptions::default();
        assert_eq!(resolve_out_dir(&options).unwrap(), PathBuf::from("dist"));
    }
}

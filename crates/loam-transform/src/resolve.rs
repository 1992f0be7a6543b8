//! Directive resolution: merging explicit options with project settings
//! into one normalized per-file directive.

use std::path::Path;

use crate::dialect::dialect_of;
use crate::options::{JsxRuntime, TransformDirective, TransformOptions};
use crate::settings::{
    CompilerSettings, ImportsNotUsedAsValues, Result, SettingsSource, WatchRegistry,
};

/// Resolve the transform directive for one file.
///
/// Dialect comes from the explicit `lang` override, else from the filename
/// extension. For typed-script files the nearest project settings file is
/// loaded and folded in; the settings file is registered for
/// change-watching whether or not it parses, so a later edit retriggers
/// resolution. Explicit options always win over settings-derived values.
pub fn resolve_directive(
    filename: &str,
    options: Option<&TransformOptions>,
    settings: &dyn SettingsSource,
    watcher: Option<&dyn WatchRegistry>,
) -> Result<TransformDirective> {
    let defaults = TransformOptions::default();
    let options = options.unwrap_or(&defaults);

    let dialect = options
        .lang
        .clone()
        .unwrap_or_else(|| dialect_of(filename));

    let mut directive = TransformDirective {
        dialect,
        jsx: options.jsx.clone(),
        strip_type_imports: None,
        sourcemap: options.sourcemap.unwrap_or(true),
        prologue: options.prologue.clone(),
        define: options.define.clone(),
    };

    if directive.dialect.is_typescript() {
        let loaded = match settings.load(Path::new(filename)) {
            Ok(loaded) => loaded,
            Err(err) => {
                // Watch the offending file before the failure propagates,
                // so fixing it self-heals on the next run.
                if let (Some(watcher), Some(file)) = (watcher, err.settings_file()) {
                    watcher.watch(file);
                }
                return Err(err);
            }
        };
        if let Some(watcher) = watcher {
            watcher.watch(&loaded.source_file);
        }
        apply_project_settings(&mut directive, &loaded.compiler);
    }

    Ok(directive)
}

fn apply_project_settings(directive: &mut TransformDirective, compiler: &CompilerSettings) {
    if directive.jsx.pragma.is_none() {
        directive.jsx.pragma = compiler.jsx_factory.clone();
    }
    if directive.jsx.pragma_fragment.is_none() {
        directive.jsx.pragma_fragment = compiler.jsx_fragment_factory.clone();
    }
    if directive.jsx.import_source.is_none() {
        directive.jsx.import_source = compiler.jsx_import_source.clone();
    }

    if directive.jsx.runtime.is_none() {
        match compiler.jsx.as_deref() {
            Some("react-jsxdev") => {
                directive.jsx.runtime = Some(JsxRuntime::Automatic);
                directive.jsx.development = Some(true);
            }
            Some("react") => directive.jsx.runtime = Some(JsxRuntime::Classic),
            Some("react-jsx") => directive.jsx.runtime = Some(JsxRuntime::Automatic),
            Some("preserve") => {
                if directive.dialect.is_jsx() {
                    tracing::warn!(
                        dialect = %directive.dialect,
                        "jsx mode \"preserve\" is not supported by the transform engine"
                    );
                }
            }
            _ => {}
        }
    }

    directive.strip_type_imports = resolve_type_import_stripping(compiler);
}

/// The type-only-import stripping decision table, highest priority first:
/// the modern unified flag decides alone when set; otherwise the legacy
/// pair, combined with its defaults, decides; contradictory legacy
/// combinations warn and leave the decision to the engine.
fn resolve_type_import_stripping(compiler: &CompilerSettings) -> Option<bool> {
    if let Some(verbatim) = compiler.verbatim_module_syntax {
        return Some(verbatim);
    }

    if compiler.preserve_value_imports.is_none() && compiler.imports_not_used_as_values.is_none() {
        return None;
    }

    let preserve = compiler.preserve_value_imports.unwrap_or(false);
    let mode = compiler
        .imports_not_used_as_values
        .unwrap_or(ImportsNotUsedAsValues::Remove);

    match (preserve, mode) {
        (false, ImportsNotUsedAsValues::Remove) => Some(true),
        (true, ImportsNotUsedAsValues::Preserve | ImportsNotUsedAsValues::Error) => Some(false),
        (preserve, mode) => {
            tracing::warn!(
                preserve_value_imports = preserve,
                imports_not_used_as_values = ?mode,
                "unsupported combination of preserveValueImports and \
                 importsNotUsedAsValues; type-only import handling left to the engine"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::options::JsxSpec;
    use crate::settings::{ProjectSettings, SettingsError};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory settings source returning fixed compiler options.
    struct FixedSettings(CompilerSettings);

    impl SettingsSource for FixedSettings {
        fn load(&self, _file: &Path) -> Result<ProjectSettings> {
            Ok(ProjectSettings {
                compiler: self.0.clone(),
                source_file: PathBuf::from("/proj/tsconfig.json"),
            })
        }
    }

    struct FailingSettings;

    impl SettingsSource for FailingSettings {
        fn load(&self, _file: &Path) -> Result<ProjectSettings> {
            Err(SettingsError::Parse {
                file: PathBuf::from("/proj/tsconfig.json"),
                message: "trailing comma".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingWatcher(Mutex<Vec<PathBuf>>);

    impl WatchRegistry for RecordingWatcher {
        fn watch(&self, file: &Path) {
            self.0.lock().unwrap().push(file.to_path_buf());
        }
    }

    fn settings(compiler: CompilerSettings) -> FixedSettings {
        FixedSettings(compiler)
    }

    fn strip_for(compiler: CompilerSettings) -> Option<bool> {
        resolve_directive("main.ts", None, &settings(compiler), None)
            .unwrap()
            .strip_type_imports
    }

    #[test]
    fn explicit_lang_overrides_extension() {
        let options = TransformOptions {
            lang: Some(Dialect::Js),
            ..TransformOptions::default()
        };
        let directive =
            resolve_directive("comp.tsx", Some(&options), &FailingSettings, None).unwrap();
        // Js dialect skips settings loading entirely.
        assert_eq!(directive.dialect, Dialect::Js);
    }

    #[test]
    fn directive_is_deterministic_for_fixed_settings() {
        let compiler = CompilerSettings {
            jsx: Some("react-jsx".to_string()),
            verbatim_module_syntax: Some(true),
            ..CompilerSettings::default()
        };
        let first =
            resolve_directive("src/app.tsx", None, &settings(compiler.clone()), None).unwrap();
        let second = resolve_directive("src/app.tsx", None, &settings(compiler), None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn jsx_modes_map_to_runtime_and_development() {
        let directive = resolve_directive(
            "app.tsx",
            None,
            &settings(CompilerSettings {
                jsx: Some("react-jsxdev".to_string()),
                ..CompilerSettings::default()
            }),
            None,
        )
        .unwrap();
        assert_eq!(directive.jsx.runtime, Some(JsxRuntime::Automatic));
        assert_eq!(directive.jsx.development, Some(true));

        let directive = resolve_directive(
            "app.tsx",
            None,
            &settings(CompilerSettings {
                jsx: Some("react".to_string()),
                ..CompilerSettings::default()
            }),
            None,
        )
        .unwrap();
        assert_eq!(directive.jsx.runtime, Some(JsxRuntime::Classic));
        assert_eq!(directive.jsx.development, None);
    }

    #[test]
    fn explicit_jsx_fields_win_over_settings() {
        let options = TransformOptions {
            jsx: JsxSpec {
                pragma: Some("h".to_string()),
                runtime: Some(JsxRuntime::Classic),
                ..JsxSpec::default()
            },
            ..TransformOptions::default()
        };
        let directive = resolve_directive(
            "app.tsx",
            Some(&options),
            &settings(CompilerSettings {
                jsx: Some("react-jsx".to_string()),
                jsx_factory: Some("React.createElement".to_string()),
                ..CompilerSettings::default()
            }),
            None,
        )
        .unwrap();

        assert_eq!(directive.jsx.pragma.as_deref(), Some("h"));
        assert_eq!(directive.jsx.runtime, Some(JsxRuntime::Classic));
    }

    #[test]
    fn modern_flag_wins_over_legacy_pair() {
        assert_eq!(
            strip_for(CompilerSettings {
                verbatim_module_syntax: Some(true),
                preserve_value_imports: Some(true),
                ..CompilerSettings::default()
            }),
            Some(true)
        );
    }

    #[test]
    fn legacy_defaults_combine_with_explicit_flag() {
        assert_eq!(
            strip_for(CompilerSettings {
                preserve_value_imports: Some(false),
                ..CompilerSettings::default()
            }),
            Some(true)
        );
    }

    #[test]
    fn preserving_value_imports_disables_stripping() {
        assert_eq!(
            strip_for(CompilerSettings {
                preserve_value_imports: Some(true),
                imports_not_used_as_values: Some(ImportsNotUsedAsValues::Preserve),
                ..CompilerSettings::default()
            }),
            Some(false)
        );
        assert_eq!(
            strip_for(CompilerSettings {
                preserve_value_imports: Some(true),
                imports_not_used_as_values: Some(ImportsNotUsedAsValues::Error),
                ..CompilerSettings::default()
            }),
            Some(false)
        );
    }

    #[test]
    fn contradictory_legacy_pair_defers_to_engine() {
        assert_eq!(
            strip_for(CompilerSettings {
                preserve_value_imports: Some(true),
                imports_not_used_as_values: Some(ImportsNotUsedAsValues::Remove),
                ..CompilerSettings::default()
            }),
            None
        );
    }

    #[test]
    fn absent_flags_leave_the_decision_unset() {
        assert_eq!(strip_for(CompilerSettings::default()), None);
    }

    #[test]
    fn settings_file_is_watched_on_success_and_failure() {
        let watcher = RecordingWatcher::default();
        resolve_directive(
            "main.ts",
            None,
            &settings(CompilerSettings::default()),
            Some(&watcher),
        )
        .unwrap();
        assert_eq!(
            *watcher.0.lock().unwrap(),
            [PathBuf::from("/proj/tsconfig.json")]
        );

        let watcher = RecordingWatcher::default();
        let err = resolve_directive("main.ts", None, &FailingSettings, Some(&watcher)).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
        assert_eq!(
            *watcher.0.lock().unwrap(),
            [PathBuf::from("/proj/tsconfig.json")]
        );
    }

    #[test]
    fn script_dialects_never_touch_settings() {
        let directive = resolve_directive("util.mjs", None, &FailingSettings, None).unwrap();
        assert_eq!(directive.dialect, Dialect::Js);
        assert!(directive.sourcemap);
    }
}

//! Typed-language project settings: the `compilerOptions` subset the
//! resolver consumes, and the source/watch collaborator traits.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SettingsError>;

/// The subset of a project settings file's `compilerOptions` that affects
/// directive resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerSettings {
    /// JSX mode tag (`react`, `react-jsx`, `react-jsxdev`, `preserve`, ...).
    /// Unknown tags impose no override.
    pub jsx: Option<String>,

    pub jsx_factory: Option<String>,
    pub jsx_fragment_factory: Option<String>,
    pub jsx_import_source: Option<String>,

    /// Modern unified flag; when set it alone decides type-only-import
    /// stripping.
    pub verbatim_module_syntax: Option<bool>,

    /// Legacy flag pair, consulted only when the modern flag is absent.
    pub preserve_value_imports: Option<bool>,
    pub imports_not_used_as_values: Option<ImportsNotUsedAsValues>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportsNotUsedAsValues {
    Remove,
    Preserve,
    Error,
}

/// Settings loaded for one file, with the settings file they came from.
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub compiler: CompilerSettings,
    pub source_file: PathBuf,
}

/// Locates and parses the nearest project settings for a file.
pub trait SettingsSource {
    fn load(&self, file: &Path) -> Result<ProjectSettings>;
}

/// Change-notification registration. Registration is additive and
/// idempotent; registering the same file twice is harmless.
pub trait WatchRegistry {
    fn watch(&self, file: &Path);
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse project settings {file}: {message}")]
    Parse { file: PathBuf, message: String },

    #[error("no project settings found for {file}")]
    NotFound { file: PathBuf },

    #[error("failed to read project settings {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SettingsError {
    /// The settings file this failure is attributed to, when one is known.
    /// Parse failures name the offending file so callers can watch it and
    /// re-resolve after an edit.
    pub fn settings_file(&self) -> Option<&Path> {
        match self {
            SettingsError::Parse { file, .. } | SettingsError::Io { file, .. } => Some(file),
            SettingsError::NotFound { .. } => None,
        }
    }
}

/// File-based settings discovery: walks up from the file's directory to
/// the nearest settings file (`tsconfig.json` by default) and reads its
/// `compilerOptions`.
pub struct FileSettingsSource {
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct SettingsDocument {
    #[serde(default, rename = "compilerOptions")]
    compiler_options: CompilerSettings,
}

impl FileSettingsSource {
    pub fn new() -> Self {
        Self {
            file_name: "tsconfig.json".to_string(),
        }
    }

    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    fn find(&self, file: &Path) -> Option<PathBuf> {
        let mut dir = file.parent();
        while let Some(current) = dir {
            let candidate = current.join(&self.file_name);
            if candidate.is_file() {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }
}

impl Default for FileSettingsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSource for FileSettingsSource {
    fn load(&self, file: &Path) -> Result<ProjectSettings> {
        let source_file = self.find(file).ok_or_else(|| SettingsError::NotFound {
            file: file.to_path_buf(),
        })?;

        let contents = fs::read_to_string(&source_file).map_err(|source| SettingsError::Io {
            file: source_file.clone(),
            source,
        })?;

        let document: SettingsDocument =
            serde_json::from_str(&contents).map_err(|err| SettingsError::Parse {
                file: source_file.clone(),
                message: err.to_string(),
            })?;

        Ok(ProjectSettings {
            compiler: document.compiler_options,
            source_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_settings_file_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("src/components");
        fs::create_dir_all(&nested).unwrap();

        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "jsx": "react" } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("src/tsconfig.json"),
            r#"{ "compilerOptions": { "jsx": "react-jsx" } }"#,
        )
        .unwrap();

        let source = FileSettingsSource::new();
        let settings = source.load(&nested.join("App.tsx")).unwrap();
        assert_eq!(settings.compiler.jsx.as_deref(), Some("react-jsx"));
        assert_eq!(settings.source_file, dir.path().join("src/tsconfig.json"));
    }

    #[test]
    fn parse_failure_names_the_offending_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings_path = dir.path().join("tsconfig.json");
        fs::write(&settings_path, "{ not json").unwrap();

        let source = FileSettingsSource::new();
        let err = source.load(&dir.path().join("main.ts")).unwrap_err();
        assert_eq!(err.settings_file(), Some(settings_path.as_path()));
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn unknown_compiler_options_are_ignored() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "strict": true, "verbatimModuleSyntax": true } }"#,
        )
        .unwrap();

        let source = FileSettingsSource::new();
        let settings = source.load(&dir.path().join("main.ts")).unwrap();
        assert_eq!(settings.compiler.verbatim_module_syntax, Some(true));
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{BuildError, Result};
use crate::permutation::VariantValue;

/// How hard to react to an identifier collision between two classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrictLevel {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "error")]
    Error,
}

impl Default for StrictLevel {
    fn default() -> Self {
        StrictLevel::Warning
    }
}

/// Builder-level options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderOptions {
    /// Cache directory (default: `.facet-cache` next to the config).
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Disable to keep the cache memory-only for this run.
    #[serde(default = "default_true")]
    pub cache: bool,

    /// Directory bundles are written to (default: current directory).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Fixed bundle filename. Without it the output is
    /// `build-<permutation checksum>.js` per permutation.
    #[serde(default)]
    pub output_file: Option<String>,

    /// Colored diagnostics on stderr.
    #[serde(default)]
    pub pretty: bool,

    /// Identifier collision handling (default: warning).
    #[serde(default)]
    pub id_collision: StrictLevel,

    /// First line of every bundle header.
    #[serde(default = "default_copyright")]
    pub copyright: String,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache: true,
            output_dir: None,
            output_file: None,
            pretty: false,
            id_collision: StrictLevel::default(),
            copyright: default_copyright(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_copyright() -> String {
    "Copyright 2026 the Facet project".to_string()
}

/// Project build configuration, loadable from `facet.json` or
/// `facet.yaml`. CLI flags merge on top of whatever the file sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    #[serde(default)]
    pub builder_options: BuilderOptions,

    /// Project roots; classes are discovered under `<root>/src`.
    #[serde(default)]
    pub projects: Vec<PathBuf>,

    /// Variant axes: field name to the list of values to build.
    /// The permutation set is the cartesian product.
    #[serde(default)]
    pub variants: IndexMap<String, Vec<VariantValue>>,

    /// Optimization pass names.
    #[serde(default)]
    pub optimizations: Vec<String>,

    /// Locales exported into every bundle.
    #[serde(default)]
    pub locales: Vec<String>,

    /// Application entry class, referenced by the boot call.
    #[serde(default)]
    pub entry: Option<String>,
}

impl BuildConfig {
    /// Loads a config file, dispatching on the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            BuildError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|err| {
                BuildError::Config(format!("invalid {}: {}", path.display(), err))
            }),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text).map_err(|err| {
                BuildError::Config(format!("invalid {}: {}", path.display(), err))
            }),
            other => Err(BuildError::Config(format!(
                "unsupported config extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Fingerprint of everything that affects cached results; a change
    /// invalidates the whole cache on open.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("config serializes to JSON");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, text: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_json_config() {
        let file = write_config(
            ".json",
            indoc! {r#"
                {
                    "builderOptions": { "idCollision": "error", "outputFile": "app.js" },
                    "projects": ["framework"],
                    "variants": { "debug": ["on", "off"] },
                    "optimizations": ["unused", "blocks"],
                    "locales": ["en_US"],
                    "entry": "main.Application"
                }
            "#},
        );
        let config = BuildConfig::load(file.path()).unwrap();

        assert_eq!(config.builder_options.id_collision, StrictLevel::Error);
        assert_eq!(config.builder_options.output_file.as_deref(), Some("app.js"));
        assert_eq!(config.projects, vec![PathBuf::from("framework")]);
        assert_eq!(
            config.variants.get("debug"),
            Some(&vec![
                VariantValue::Str("on".into()),
                VariantValue::Str("off".into())
            ])
        );
        assert_eq!(config.entry.as_deref(), Some("main.Application"));
    }

    #[test]
    fn test_load_yaml_config() {
        let file = write_config(
            ".yaml",
            indoc! {r#"
                projects:
                  - framework
                variants:
                  debug: [true, false]
                entry: main.Application
            "#},
        );
        let config = BuildConfig::load(file.path()).unwrap();

        assert_eq!(
            config.variants.get("debug"),
            Some(&vec![VariantValue::Bool(true), VariantValue::Bool(false)])
        );
        assert!(config.builder_options.cache);
    }

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.builder_options.id_collision, StrictLevel::Warning);
        assert!(config.builder_options.cache);
        assert!(config.builder_options.output_file.is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut a = BuildConfig::default();
        let b = BuildConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());

        a.optimizations.push("privates".to_string());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_unknown_extension_is_a_config_error() {
        let file = write_config(".toml", "entry = 1");
        let err = BuildConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }
}

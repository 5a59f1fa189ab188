//! Settings files: registry contents plus the highlight policy.
//!
//! ```yaml
//! highlight: valid-subset
//! fields:
//!   - name: wdxTotalAssets
//!     type: 450
//!     label: wdx Total Assets
//! valid:
//!   - wdxTotalAssets
//! ```

use std::path::{Path, PathBuf};

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

use crate::classifier::HighlightPolicy;
use crate::errors::{FieldRefError, FieldRefResult};
use crate::registry::{FieldDescriptor, FieldRegistry, RegistryConfig};
use crate::text::LineIndex;

/// File names looked up in the working directory, in order
pub const DEFAULT_CONFIG_FILES: [&str; 3] = ["fieldref.yaml", "fieldref.yml", "fieldref.json"];

/// Serialization format of a settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SettingsFile")]
pub struct Settings {
    #[serde(flatten)]
    pub registry: RegistryConfig,
    pub highlight: HighlightPolicy,
}

/// Layout of a settings file. Read without `flatten` so parse errors keep
/// their location.
#[derive(Deserialize)]
struct SettingsFile {
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    valid: Vec<String>,
    #[serde(default)]
    highlight: HighlightPolicy,
}

impl From<SettingsFile> for Settings {
    fn from(file: SettingsFile) -> Self {
        Self {
            registry: RegistryConfig {
                fields: file.fields,
                valid: file.valid,
            },
            highlight: file.highlight,
        }
    }
}

impl Settings {
    /// Settings backed by the sample registry
    pub fn sample() -> Self {
        Self {
            registry: RegistryConfig::sample(),
            highlight: HighlightPolicy::default(),
        }
    }

    /// Parse settings text. `origin` names the source in error messages.
    pub fn parse(source: &str, format: ConfigFormat, origin: &str) -> FieldRefResult<Self> {
        let parsed = match format {
            ConfigFormat::Json => serde_json::from_str(source).map_err(|e| {
                let offset = json_error_offset(source, e.line(), e.column());
                (e.to_string(), offset)
            }),
            ConfigFormat::Yaml => serde_yaml::from_str(source).map_err(|e| {
                let offset = e.location().map(|loc| loc.index());
                (e.to_string(), offset)
            }),
        };

        parsed.map_err(|(message, offset)| FieldRefError::ConfigParse {
            src: source.to_string(),
            span: offset.map(|offset| error_span(source, offset)),
            path: origin.to_string(),
            message,
        })
    }

    pub fn load(path: &Path) -> FieldRefResult<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            FieldRefError::UnsupportedConfigFormat {
                path: path.display().to_string(),
            }
        })?;
        let source =
            std::fs::read_to_string(path).map_err(|e| FieldRefError::read_failed(path, e))?;
        tracing::info!(path = %path.display(), "loading field configuration");
        Self::parse(&source, format, &path.display().to_string())
    }

    /// Validate the registry part
    pub fn build_registry(&self) -> FieldRefResult<FieldRegistry> {
        FieldRegistry::from_config(self.registry.clone())
    }
}

/// First default settings file present in `dir`
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Settings from an explicit path, a discovered file in `dir`, or the sample
pub fn resolve(explicit: Option<&Path>, dir: &Path) -> FieldRefResult<Settings> {
    match explicit.map(Path::to_path_buf).or_else(|| discover(dir)) {
        Some(path) => Settings::load(&path),
        None => {
            tracing::info!("no configuration file found, using the sample field registry");
            Ok(Settings::sample())
        }
    }
}

/// serde_json reports 1-based line/column; line 0 means "no position"
fn json_error_offset(source: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let index = LineIndex::new(source);
    let start = index.line_start(line - 1)?;
    Some((start + column.saturating_sub(1)).min(source.len()))
}

fn error_span(source: &str, offset: usize) -> SourceSpan {
    let len = source
        .get(offset..)
        .and_then(|rest| rest.chars().next())
        .map_or(0, char::len_utf8);
    (offset, len).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeTag;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const YAML: &str = r#"
highlight: any-descriptor
fields:
  - name: wdxTotalAssets
    type: 450
    label: wdx Total Assets
  - name: wdxNetIncome
    type: string
    value: wdx Net Income
valid:
  - wdxTotalAssets
"#;

    #[test]
    fn test_parse_yaml() {
        let settings = Settings::parse(YAML, ConfigFormat::Yaml, "inline").unwrap();
        assert_eq!(settings.highlight, HighlightPolicy::AnyDescriptor);
        assert_eq!(settings.registry.fields.len(), 2);
        assert_eq!(settings.registry.fields[0].type_tag, TypeTag::Code(450));
        assert_eq!(settings.registry.fields[1].label, "wdx Net Income");
        assert_eq!(settings.registry.valid, vec!["wdxTotalAssets".to_string()]);
    }

    #[test]
    fn test_parse_json_defaults_policy() {
        let json = r#"{"fields": [{"name": "a", "type": "string", "label": "A"}], "valid": ["a"]}"#;
        let settings = Settings::parse(json, ConfigFormat::Json, "inline").unwrap();
        assert_eq!(settings.highlight, HighlightPolicy::ValidSubset);
        let registry = settings.build_registry().unwrap();
        assert!(registry.is_valid("a"));
    }

    #[test]
    fn test_parse_error_has_span() {
        let json = "{\n  \"fields\": [\n    {\"name\": }\n  ]\n}";
        let err = Settings::parse(json, ConfigFormat::Json, "bad.json").unwrap_err();
        match &err {
            FieldRefError::ConfigParse { path, span, .. } => {
                assert_eq!(path, "bad.json");
                assert!(span.is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.span().unwrap().start <= json.len());
    }

    #[test]
    fn test_yaml_field_error_points_at_value() {
        let yaml = "highlight: valid-subset\nfields:\n  - name: a\n    type: 4.5\n    label: A\n";
        let err = Settings::parse(yaml, ConfigFormat::Yaml, "bad.yaml").unwrap_err();
        match &err {
            FieldRefError::ConfigParse { message, .. } => {
                assert!(message.contains("expected a type name or an integer type code"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let span = err.span().unwrap();
        assert!(yaml[span.start..].starts_with("4.5"), "span at {}", span.start);
    }

    #[test]
    fn test_yaml_negative_type_code() {
        let yaml = "fields:\n  - name: a\n    type: -3\n    label: A\nvalid: [a]\n";
        let settings = Settings::parse(yaml, ConfigFormat::Yaml, "inline").unwrap();
        assert_eq!(settings.registry.fields[0].type_tag, TypeTag::Code(-3));
        assert!(settings.build_registry().is_ok());
    }

    #[test]
    fn test_settings_serialize_flat() {
        let yaml = serde_yaml::to_string(&Settings::sample()).unwrap();
        let parsed = Settings::parse(&yaml, ConfigFormat::Yaml, "inline").unwrap();
        assert_eq!(parsed, Settings::sample());
        assert!(yaml.starts_with("fields:"), "{}", yaml);
    }

    #[test]
    fn test_orphan_valid_name_fails_at_build() {
        let yaml = "fields: []\nvalid: [ghost]\n";
        let settings = Settings::parse(yaml, ConfigFormat::Yaml, "inline").unwrap();
        assert!(matches!(
            settings.build_registry(),
            Err(FieldRefError::ValidFieldWithoutDescriptor { .. })
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("x/fieldref.yml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("fields.json")),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_path(Path::new("fields.toml")), None);
        assert_eq!(ConfigFormat::from_name("YAML"), Some(ConfigFormat::Yaml));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let err = Settings::load(Path::new("fields.toml")).unwrap_err();
        assert!(matches!(err, FieldRefError::UnsupportedConfigFormat { .. }));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, FieldRefError::IoError { .. }));
    }

    #[test]
    fn test_resolve_discovers_or_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let settings = resolve(None, dir.path()).unwrap();
        assert_eq!(settings, Settings::sample());

        let mut file = std::fs::File::create(dir.path().join("fieldref.yaml")).unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        assert_eq!(
            discover(dir.path()),
            Some(dir.path().join("fieldref.yaml"))
        );
        let settings = resolve(None, dir.path()).unwrap();
        assert_eq!(settings.registry.fields.len(), 2);
    }
}

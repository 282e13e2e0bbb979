//! Index template files and the settings they declare.
//!
//! A template is identified by its file name minus the `.json` extension,
//! and its body is pushed to the cluster wholesale; the cluster keeps only
//! the latest version under that name. The one part of the body this tool
//! ever interprets is the pair of write-path settings it tunes during a
//! rotation, decoded once into [`IndexSettings`].
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

/// A template definition read from disk.
#[derive(Debug, Clone)]
pub struct IndexTemplate {
    /// The template name, which is also the alias a rotation maintains.
    pub name: String,
    /// The full template body, pushed as-is.
    pub body: Value,
}

impl IndexTemplate {
    /// Reads a template from a `<name>.json` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("failed reading file {}", path.display()))?;

        Self::from_source(template_name(path)?, &bytes)
    }

    /// Builds a template from an already-known name and raw JSON bytes.
    pub fn from_source(name: String, bytes: &[u8]) -> Result<Self> {
        let body = serde_json::from_slice(bytes)
            .with_context(|| format!("template {} is not valid JSON", name))?;

        Ok(Self { name, body })
    }
}

/// Derives the template (and alias) name from a file path.
pub fn template_name(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid template file name {}", path.display()))?;

    let name = file_name.strip_suffix(".json").unwrap_or(file_name);

    if name.is_empty() {
        bail!("template file {} has an empty name", path.display());
    }

    Ok(name.to_owned())
}

/// Lists the template files in a directory.
///
/// Only regular files count and hidden entries are skipped. The result is
/// sorted by name so directory batches run in a stable order.
pub fn template_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed reading files in directory {}", dir.display()))?;

    let mut files = Vec::new();

    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed reading files in directory {}", dir.display()))?;

        let hidden = entry
            .file_name()
            .to_str()
            .map_or(false, |name| name.starts_with('.'));

        if hidden || !entry.file_type()?.is_file() {
            continue;
        }

        files.push(entry.path());
    }

    files.sort();
    Ok(files)
}

/// The two index settings a rotation tunes and restores.
///
/// Values are kept as raw JSON so whatever form the template used (string
/// or number) is pushed back unchanged. A missing key is a defined default:
/// restoring it writes `null`, which resets the index to the cluster
/// default.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct IndexSettings {
    #[serde(default)]
    pub refresh_interval: Option<Value>,
    #[serde(default)]
    pub number_of_replicas: Option<Value>,
}

impl IndexSettings {
    /// Decodes the settings block of a template body.
    ///
    /// Elasticsearch accepts both the nested `settings.index.*` form and
    /// the top-level `settings.*` shorthand; keys under `index` win when
    /// both are present.
    pub fn from_template_body(body: &Value) -> IndexSettings {
        let settings = match body.get("settings") {
            Some(settings) => settings,
            None => return IndexSettings::default(),
        };

        let flat = decode(settings);
        let nested = settings.get("index").map(decode).unwrap_or_default();

        IndexSettings {
            refresh_interval: nested.refresh_interval.or(flat.refresh_interval),
            number_of_replicas: nested.number_of_replicas.or(flat.number_of_replicas),
        }
    }
}

fn decode(value: &Value) -> IndexSettings {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// Settings applied while bulk indexing into a fresh index.
pub fn bulk_mode_body() -> Value {
    json!({
        "index": {
            "refresh_interval": "-1",
            "number_of_replicas": "0"
        }
    })
}

/// Settings that undo [`bulk_mode_body`], restoring whatever the template
/// declares. `null` resets a setting the template leaves out.
pub fn steady_state_body(settings: &IndexSettings) -> Value {
    json!({
        "index": {
            "refresh_interval": settings.refresh_interval.clone().unwrap_or(Value::Null),
            "number_of_replicas": settings.number_of_replicas.clone().unwrap_or(Value::Null)
        }
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::{json, Value};

    use super::{
        bulk_mode_body, steady_state_body, template_name, IndexSettings, IndexTemplate,
    };

    #[test]
    fn name_is_the_file_name_minus_the_json_extension() {
        let name = template_name(Path::new("/etc/templates/twitter.json")).unwrap();

        assert_eq!(name, "twitter");
    }

    #[test]
    fn name_of_a_non_json_file_is_kept_whole() {
        let name = template_name(Path::new("templates/twitter.v2")).unwrap();

        assert_eq!(name, "twitter.v2");
    }

    #[test]
    fn template_body_must_be_valid_json() {
        let result = IndexTemplate::from_source("twitter".to_owned(), b"{not json");

        assert!(result.is_err());
    }

    #[test]
    fn settings_decode_from_the_nested_index_block() {
        let template = IndexTemplate::from_source(
            "twitter".to_owned(),
            br#"{
                "index_patterns": ["twitter-*"],
                "settings": {
                    "index": {
                        "refresh_interval": "30s",
                        "number_of_replicas": 2
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            IndexSettings::from_template_body(&template.body),
            IndexSettings {
                refresh_interval: Some(json!("30s")),
                number_of_replicas: Some(json!(2)),
            }
        );
    }

    #[test]
    fn settings_decode_from_the_flat_shorthand() {
        let body = json!({
            "settings": {
                "refresh_interval": "5s"
            }
        });

        let settings = IndexSettings::from_template_body(&body);

        assert_eq!(settings.refresh_interval, Some(json!("5s")));
        assert_eq!(settings.number_of_replicas, None);
    }

    #[test]
    fn nested_settings_win_over_the_flat_shorthand() {
        let body = json!({
            "settings": {
                "refresh_interval": "5s",
                "index": {
                    "refresh_interval": "30s"
                }
            }
        });

        let settings = IndexSettings::from_template_body(&body);

        assert_eq!(settings.refresh_interval, Some(json!("30s")));
    }

    #[test]
    fn missing_settings_are_a_defined_default() {
        let body = json!({ "mappings": {} });

        assert_eq!(IndexSettings::from_template_body(&body), IndexSettings::default());
    }

    #[test]
    fn bulk_mode_disables_refresh_and_replicas() {
        assert_eq!(
            bulk_mode_body(),
            json!({
                "index": {
                    "refresh_interval": "-1",
                    "number_of_replicas": "0"
                }
            })
        );
    }

    #[test]
    fn steady_state_restores_declared_values() {
        let settings = IndexSettings {
            refresh_interval: Some(json!("30s")),
            number_of_replicas: Some(json!(2)),
        };

        assert_eq!(
            steady_state_body(&settings),
            json!({
                "index": {
                    "refresh_interval": "30s",
                    "number_of_replicas": 2
                }
            })
        );
    }

    #[test]
    fn steady_state_falls_back_to_cluster_defaults() {
        assert_eq!(
            steady_state_body(&IndexSettings::default()),
            json!({
                "index": {
                    "refresh_interval": Value::Null,
                    "number_of_replicas": Value::Null
                }
            })
        );
    }
}

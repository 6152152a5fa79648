//! File-facing glue around the engine: descriptor files, model configs and
//! checkpoint name lists. Nothing in the engine modules depends on this one.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::builtin;
use crate::descriptor::Descriptor;
use crate::errors::{ExpansionError, LoadError, Result};

const INLINE_ORIGIN: &str = "<inline>";

impl Descriptor {
    /// Reads and validates a descriptor; the format follows the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let descriptor: Descriptor = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") => toml::from_str(&contents)?,
            Some(other) => {
                return Err(LoadError::UnsupportedFormat(format!(
                    "unsupported descriptor extension '{other}'"
                )));
            }
            None => {
                return Err(LoadError::UnsupportedFormat(format!(
                    "descriptor path '{}' has no extension",
                    path.display()
                )));
            }
        };

        descriptor.validated(path)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let descriptor: Descriptor = serde_json::from_str(contents)?;
        descriptor.validated(Path::new(INLINE_ORIGIN))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let descriptor: Descriptor = toml::from_str(contents)?;
        descriptor.validated(Path::new(INLINE_ORIGIN))
    }

    fn validated(self, origin: &Path) -> Result<Self> {
        self.validate().map_err(|source| LoadError::Descriptor {
            origin: origin.to_path_buf(),
            source,
        })?;
        log::debug!(
            "loaded descriptor '{}' from {} ({} pre, {} per layer, {} post)",
            self.model_type,
            origin.display(),
            self.pre_weights.len(),
            self.layer_templates.weights.len(),
            self.post_weights.len()
        );
        Ok(self)
    }
}

/// Looks up `key` in a model's `config.json`.
///
/// A dotted key such as `text_config.num_hidden_layers` walks nested objects
/// when no top-level field carries the literal key.
pub fn resolve_layer_count(
    model_config: &Value,
    key: &str,
) -> std::result::Result<usize, ExpansionError> {
    let invalid = |found: String| ExpansionError::NegativeOrMissingLayerCount {
        key: key.to_string(),
        found,
    };

    let value = match model_config.get(key) {
        Some(value) => Some(value),
        None => key
            .split('.')
            .try_fold(model_config, |current, segment| current.get(segment)),
    };

    let value = value.ok_or_else(|| invalid("nothing".to_string()))?;
    value
        .as_u64()
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| invalid(value.to_string()))
}

pub fn read_model_config(path: impl AsRef<Path>) -> Result<Value> {
    let contents = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&contents)?)
}

/// Architecture names declared by a model config (`architectures` field).
pub fn config_architectures(model_config: &Value) -> Vec<String> {
    model_config
        .get("architectures")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reads the tensor names a source checkpoint provides.
///
/// `.json` files may be a sharded checkpoint index (names are the keys of its
/// `weight_map`) or a plain array of names. Anything else is read as one name
/// per line; blank lines and `#` comments are ignored.
pub fn read_name_list(path: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect());
    }

    let value: Value = serde_json::from_str(&contents)?;
    if let Some(weight_map) = value.get("weight_map").and_then(Value::as_object) {
        return Ok(weight_map.keys().cloned().collect());
    }
    if let Some(items) = value.as_array() {
        return items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    LoadError::UnsupportedFormat(format!(
                        "name list {} contains a non-string entry",
                        path.display()
                    ))
                })
            })
            .collect();
    }
    Err(LoadError::UnsupportedFormat(format!(
        "{} is neither a checkpoint index nor a list of names",
        path.display()
    )))
}

/// A set of descriptors, searched by architecture name.
#[derive(Debug, Clone, Default)]
pub struct DescriptorCatalog {
    entries: Vec<(PathBuf, Descriptor)>,
}

impl DescriptorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `.json` and `.toml` file in `dir`, in file name order.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_descriptor = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("json") | Some("toml")
            );
            if path.is_file() && is_descriptor {
                paths.push(path);
            }
        }
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            let descriptor = Descriptor::from_path(&path)?;
            catalog.insert(path, descriptor);
        }
        log::info!(
            "loaded {} descriptor(s) from {}",
            catalog.len(),
            dir.display()
        );
        Ok(catalog)
    }

    /// Catalog of the descriptors compiled into the crate.
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::new();
        for &name in builtin::NAMES {
            let descriptor = builtin::descriptor(name)?;
            catalog.insert(PathBuf::from(format!("builtin:{name}")), descriptor);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, origin: PathBuf, descriptor: Descriptor) {
        self.entries.push((origin, descriptor));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Descriptor)> {
        self.entries
            .iter()
            .map(|(origin, descriptor)| (origin.as_path(), descriptor))
    }

    /// First descriptor supporting any of `architectures`.
    pub fn find<S: AsRef<str>>(&self, architectures: &[S]) -> Option<&Descriptor> {
        self.entries
            .iter()
            .map(|(_, descriptor)| descriptor)
            .find(|descriptor| {
                architectures
                    .iter()
                    .any(|arch| descriptor.supports(arch.as_ref()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layer_count_from_top_level_key() {
        let config = json!({"n_layers": 6, "dim": 768});
        assert_eq!(resolve_layer_count(&config, "n_layers"), Ok(6));
    }

    #[test]
    fn layer_count_from_nested_key() {
        let config = json!({"text_config": {"num_hidden_layers": 32}});
        assert_eq!(
            resolve_layer_count(&config, "text_config.num_hidden_layers"),
            Ok(32)
        );
    }

    #[test]
    fn layer_count_rejects_missing_negative_and_fractional() {
        let config = json!({"a": -1, "b": 2.5, "c": "12"});
        for (key, found) in [("a", "-1"), ("b", "2.5"), ("c", "\"12\""), ("d", "nothing")] {
            assert_eq!(
                resolve_layer_count(&config, key),
                Err(ExpansionError::NegativeOrMissingLayerCount {
                    key: key.into(),
                    found: found.into(),
                })
            );
        }
    }

    #[test]
    fn architectures_are_read_from_config() {
        let config = json!({"architectures": ["DistilBertForMaskedLM", 3]});
        assert_eq!(config_architectures(&config), ["DistilBertForMaskedLM"]);
        assert!(config_architectures(&json!({})).is_empty());
    }
}

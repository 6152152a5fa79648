//! Layer-indexed name templates.
//!
//! Descriptor strings mark the per-layer substitution point with
//! [`LAYER_INDEX_PLACEHOLDER`]. Each string is parsed once into a
//! [`NameTemplate`] holding the text on either side of the placeholder, so
//! instantiating a layer is a single concatenation rather than a rescan.

use std::fmt;

use crate::descriptor::WeightEntry;
use crate::errors::{DescriptorError, PlaceholderIssue};

pub const LAYER_INDEX_PLACEHOLDER: &str = "${layer_index}";

/// A name with at most one layer index substitution point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameTemplate {
    Fixed(String),
    Indexed { prefix: String, suffix: String },
}

impl NameTemplate {
    pub fn parse(raw: &str) -> Result<Self, PlaceholderIssue> {
        let mut occurrences = 0usize;
        for (start, _) in raw.match_indices("${") {
            let token = match raw[start..].find('}') {
                Some(end) => &raw[start..=start + end],
                None => &raw[start..],
            };
            if token != LAYER_INDEX_PLACEHOLDER {
                return Err(PlaceholderIssue::Unknown(token.to_string()));
            }
            occurrences += 1;
        }

        match occurrences {
            0 => Ok(NameTemplate::Fixed(raw.to_string())),
            1 => {
                let (prefix, suffix) = raw
                    .split_once(LAYER_INDEX_PLACEHOLDER)
                    .ok_or_else(|| PlaceholderIssue::Unknown(raw.to_string()))?;
                Ok(NameTemplate::Indexed {
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                })
            }
            _ => Err(PlaceholderIssue::Repeated(raw.to_string())),
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, NameTemplate::Indexed { .. })
    }

    pub fn instantiate(&self, layer_index: usize) -> String {
        match self {
            NameTemplate::Fixed(name) => name.clone(),
            NameTemplate::Indexed { prefix, suffix } => format!("{prefix}{layer_index}{suffix}"),
        }
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTemplate::Fixed(name) => f.write_str(name),
            NameTemplate::Indexed { prefix, suffix } => {
                write!(f, "{prefix}{LAYER_INDEX_PLACEHOLDER}{suffix}")
            }
        }
    }
}

/// A layer template entry with every string parsed up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTemplate {
    name: NameTemplate,
    aliases: Vec<NameTemplate>,
    tied_names: Vec<NameTemplate>,
    is_embed: bool,
    optional: bool,
}

impl LayerTemplate {
    /// Parses an entry from `layer_templates.weights`.
    ///
    /// The placeholder must be present in the name, every alias and every tied
    /// name, or absent from all of them.
    pub fn compile(entry: &WeightEntry) -> Result<Self, DescriptorError> {
        let parse = |raw: &str| {
            NameTemplate::parse(raw).map_err(|reason| DescriptorError::InconsistentPlaceholder {
                entry: entry.name.clone(),
                reason,
            })
        };

        let name = parse(entry.name.as_str())?;
        let aliases = entry
            .aliases
            .iter()
            .map(|alias| parse(alias.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let tied_names = entry
            .tied_names
            .iter()
            .map(|tied| parse(tied.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let indexed = name.is_indexed();
        if aliases
            .iter()
            .chain(tied_names.iter())
            .any(|template| template.is_indexed() != indexed)
        {
            return Err(DescriptorError::InconsistentPlaceholder {
                entry: entry.name.clone(),
                reason: PlaceholderIssue::Mixed,
            });
        }

        Ok(Self {
            name,
            aliases,
            tied_names,
            is_embed: entry.is_embed,
            optional: entry.optional,
        })
    }

    pub fn is_indexed(&self) -> bool {
        self.name.is_indexed()
    }

    pub fn instantiate(&self, layer_index: usize) -> WeightEntry {
        WeightEntry {
            name: self.name.instantiate(layer_index),
            aliases: self
                .aliases
                .iter()
                .map(|alias| alias.instantiate(layer_index))
                .collect(),
            is_embed: self.is_embed,
            optional: self.optional,
            tied_names: self
                .tied_names
                .iter()
                .map(|tied| tied.instantiate(layer_index))
                .collect(),
        }
    }
}

/// Rejects any placeholder in a pre/post entry.
pub(crate) fn ensure_fixed(entry: &WeightEntry) -> Result<(), DescriptorError> {
    for raw in entry.strings() {
        let template =
            NameTemplate::parse(raw).map_err(|reason| DescriptorError::InconsistentPlaceholder {
                entry: entry.name.clone(),
                reason,
            })?;
        if template.is_indexed() {
            return Err(DescriptorError::InconsistentPlaceholder {
                entry: entry.name.clone(),
                reason: PlaceholderIssue::OutsideLayer,
            });
        }
    }
    Ok(())
}

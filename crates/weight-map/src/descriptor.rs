//! Parsed architecture descriptors.
//!
//! A descriptor lists the parameters of a model family in three groups: fixed
//! weights emitted before the repeated blocks, layer templates instantiated once
//! per layer, and fixed weights emitted after. Entries may carry aliases
//! (historical names for the same tensor) and tied names (tensors whose storage
//! the entry shares). Descriptors are plain values; [`Descriptor::validate`]
//! checks structure without touching any checkpoint.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DescriptorError;
use crate::template::{ensure_fixed, LayerTemplate};

/// One named parameter slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_embed: bool,
    /// Absence from the source checkpoint is tolerated.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tied_names: Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl WeightEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            is_embed: false,
            optional: false,
            tied_names: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tied_names<I, S>(mut self, tied_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tied_names = tied_names.into_iter().map(Into::into).collect();
        self
    }

    pub fn mark_embed(mut self) -> Self {
        self.is_embed = true;
        self
    }

    pub fn mark_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Canonical name followed by aliases; the names that identify this entry.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Every string of the entry, tied names included.
    pub(crate) fn strings(&self) -> impl Iterator<Item = &str> {
        self.names().chain(self.tied_names.iter().map(String::as_str))
    }
}

/// The `layer_templates` object of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTemplates {
    pub weights: Vec<WeightEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightGroup {
    Pre,
    Layer,
    Post,
}

impl fmt::Display for WeightGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WeightGroup::Pre => "pre_weights",
            WeightGroup::Layer => "layer_templates.weights",
            WeightGroup::Post => "post_weights",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub model_type: String,
    pub architectures: Vec<String>,
    pub pre_weights: Vec<WeightEntry>,
    pub num_layers_config_key: String,
    pub layer_templates: LayerTemplates,
    pub post_weights: Vec<WeightEntry>,
}

impl Descriptor {
    pub fn new(model_type: impl Into<String>, num_layers_config_key: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            architectures: Vec::new(),
            pre_weights: Vec::new(),
            num_layers_config_key: num_layers_config_key.into(),
            layer_templates: LayerTemplates::default(),
            post_weights: Vec::new(),
        }
    }

    /// Configuration key whose integer value is the layer count.
    pub fn num_layers_source(&self) -> &str {
        &self.num_layers_config_key
    }

    pub fn supports(&self, architecture: &str) -> bool {
        self.architectures.iter().any(|arch| arch == architecture)
    }

    pub fn groups(&self) -> [(WeightGroup, &[WeightEntry]); 3] {
        [
            (WeightGroup::Pre, self.pre_weights.as_slice()),
            (WeightGroup::Layer, self.layer_templates.weights.as_slice()),
            (WeightGroup::Post, self.post_weights.as_slice()),
        ]
    }

    /// Number of concrete entries produced for `num_layers`, or `None` on overflow.
    pub fn expanded_len(&self, num_layers: usize) -> Option<usize> {
        num_layers
            .checked_mul(self.layer_templates.weights.len())?
            .checked_add(self.pre_weights.len())?
            .checked_add(self.post_weights.len())
    }

    /// Checks names, aliases and placeholders.
    ///
    /// Templated names are not compared with each other here because they only
    /// become comparable once a layer index is substituted; expansion repeats
    /// the collision check over the concrete list.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        for (group, entries) in self.groups() {
            for (index, entry) in entries.iter().enumerate() {
                if entry.name.is_empty() {
                    return Err(DescriptorError::EmptyName { group, index });
                }
                if entry
                    .aliases
                    .iter()
                    .chain(entry.tied_names.iter())
                    .any(String::is_empty)
                {
                    return Err(DescriptorError::EmptyAlias(entry.name.clone()));
                }
                match group {
                    WeightGroup::Layer => {
                        LayerTemplate::compile(entry)?;
                    }
                    WeightGroup::Pre | WeightGroup::Post => ensure_fixed(entry)?,
                }
            }
        }

        check_collisions(self.pre_weights.iter().chain(self.post_weights.iter()))
    }
}

/// Canonical names and aliases share one namespace; tied names are excluded
/// since they deliberately point at another entry's tensor.
pub(crate) fn check_collisions<'a, I>(entries: I) -> Result<(), DescriptorError>
where
    I: IntoIterator<Item = &'a WeightEntry>,
{
    struct Claim<'a> {
        owner: &'a str,
        canonical: bool,
    }

    let mut claims: HashMap<&'a str, Claim<'a>> = HashMap::new();
    for entry in entries {
        for (position, name) in entry.names().enumerate() {
            let canonical = position == 0;
            if let Some(existing) = claims.get(name) {
                if canonical && existing.canonical {
                    return Err(DescriptorError::DuplicateName(name.to_string()));
                }
                return Err(DescriptorError::AliasCollision {
                    name: name.to_string(),
                    first: existing.owner.to_string(),
                    second: entry.name.clone(),
                });
            }
            claims.insert(
                name,
                Claim {
                    owner: entry.name.as_str(),
                    canonical,
                },
            );
        }
    }
    Ok(())
}

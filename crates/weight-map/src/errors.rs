use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::WeightGroup;

pub type Result<T> = std::result::Result<T, LoadError>;

/// What is wrong with a `${layer_index}` placeholder inside one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderIssue {
    /// The placeholder occurs more than once in a single string.
    Repeated(String),
    /// A `${...}` token other than the layer index placeholder.
    Unknown(String),
    /// Some strings of the entry carry the placeholder and others do not.
    Mixed,
    /// A fixed (pre/post) entry carries the placeholder.
    OutsideLayer,
}

impl fmt::Display for PlaceholderIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderIssue::Repeated(raw) => {
                write!(f, "placeholder appears more than once in '{raw}'")
            }
            PlaceholderIssue::Unknown(token) => write!(f, "unknown placeholder token '{token}'"),
            PlaceholderIssue::Mixed => {
                f.write_str("placeholder must appear in every name and alias or in none")
            }
            PlaceholderIssue::OutsideLayer => {
                f.write_str("placeholder is only allowed in layer templates")
            }
        }
    }
}

/// Structural problems found in a descriptor before any expansion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("duplicate weight name '{0}'")]
    DuplicateName(String),

    #[error("name '{name}' is claimed by both '{first}' and '{second}'")]
    AliasCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("inconsistent placeholder in '{entry}': {reason}")]
    InconsistentPlaceholder {
        entry: String,
        reason: PlaceholderIssue,
    },

    #[error("empty alias on '{0}'")]
    EmptyAlias(String),

    #[error("{group} entry #{index} has an empty name")]
    EmptyName { group: WeightGroup, index: usize },
}

impl DescriptorError {
    /// The contested name for duplicate and collision errors.
    pub fn colliding_name(&self) -> Option<&str> {
        match self {
            DescriptorError::DuplicateName(name) | DescriptorError::AliasCollision { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("layer count '{key}' must be a non-negative integer, found {found}")]
    NegativeOrMissingLayerCount { key: String, found: String },

    #[error("name '{0}' appears more than once after layer expansion")]
    PostExpansionDuplicate(String),

    #[error("expanding {num_layers} layers exceeds addressable capacity")]
    CapacityOverflow { num_layers: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("'{name}' not found in source checkpoint{}", describe_tried(.tried))]
    NotFound { name: String, tried: Vec<String> },
}

impl ResolutionError {
    pub fn name(&self) -> &str {
        match self {
            ResolutionError::NotFound { name, .. } => name,
        }
    }
}

fn describe_tried(tried: &[String]) -> String {
    if tried.is_empty() {
        String::new()
    } else {
        format!(" (also tried {})", tried.join(", "))
    }
}

/// Failure of a whole mapping run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Expansion(ExpansionError),

    #[error("{} weight(s) could not be resolved: {}", .0.len(), describe_unresolved(.0))]
    Unresolved(Vec<ResolutionError>),
}

impl MappingError {
    /// Every unresolved entry, in expansion order. Empty for structural errors.
    pub fn unresolved(&self) -> &[ResolutionError] {
        match self {
            MappingError::Unresolved(errors) => errors,
            _ => &[],
        }
    }

    pub fn unresolved_names(&self) -> Vec<&str> {
        self.unresolved().iter().map(ResolutionError::name).collect()
    }
}

impl From<ExpansionError> for MappingError {
    fn from(value: ExpansionError) -> Self {
        match value {
            ExpansionError::Descriptor(err) => MappingError::Descriptor(err),
            other => MappingError::Expansion(other),
        }
    }
}

fn describe_unresolved(errors: &[ResolutionError]) -> String {
    errors
        .iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while locating and parsing descriptor files.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported descriptor format: {0}")]
    UnsupportedFormat(String),

    #[error("unknown built-in descriptor '{0}'")]
    UnknownBuiltin(String),

    #[error("invalid descriptor {}: {source}", .origin.display())]
    Descriptor {
        origin: PathBuf,
        #[source]
        source: DescriptorError,
    },

    #[error(transparent)]
    Expansion(#[from] ExpansionError),
}

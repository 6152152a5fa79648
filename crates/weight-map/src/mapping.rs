//! Builds the target-to-source table for one conversion run.
//!
//! The engine is stateless: each call validates the descriptor, expands it,
//! and resolves every concrete entry against the caller's name set. Missing
//! tensors are collected rather than short-circuited so a single failed run
//! reports all of them.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::descriptor::Descriptor;
use crate::errors::MappingError;
use crate::expand::expand_validated;
use crate::resolve::{resolve_with, NameSet, NoopObserver, ResolutionObserver, ResolvedVia};

/// One resolved row of the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MappedWeight {
    pub target: String,
    pub source: String,
    pub via: ResolvedVia,
    pub is_embed: bool,
}

/// Ordered, immutable result of [`build_mapping`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedMapping {
    weights: Vec<MappedWeight>,
    skipped_optional: Vec<String>,
    #[serde(skip)]
    by_target: HashMap<String, usize>,
}

impl ResolvedMapping {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Rows in expansion order.
    pub fn iter(&self) -> std::slice::Iter<'_, MappedWeight> {
        self.weights.iter()
    }

    pub fn get(&self, target: &str) -> Option<&MappedWeight> {
        self.by_target.get(target).map(|&index| &self.weights[index])
    }

    pub fn source_for(&self, target: &str) -> Option<&str> {
        self.get(target).map(|weight| weight.source.as_str())
    }

    /// Targets reading `source`; more than one when names are tied.
    pub fn targets_for_source<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.weights
            .iter()
            .filter(move |weight| weight.source == source)
            .map(|weight| weight.target.as_str())
    }

    /// Distinct source tensors to read, in first-use order.
    pub fn sources(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.weights
            .iter()
            .map(|weight| weight.source.as_str())
            .filter(|source| seen.insert(*source))
            .collect()
    }

    pub fn embeddings(&self) -> impl Iterator<Item = &MappedWeight> {
        self.weights.iter().filter(|weight| weight.is_embed)
    }

    /// Optional entries absent from the source checkpoint.
    pub fn skipped_optional(&self) -> &[String] {
        &self.skipped_optional
    }

    fn push(&mut self, weight: MappedWeight) {
        self.by_target.insert(weight.target.clone(), self.weights.len());
        self.weights.push(weight);
    }
}

impl<'a> IntoIterator for &'a ResolvedMapping {
    type Item = &'a MappedWeight;
    type IntoIter = std::slice::Iter<'a, MappedWeight>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub fn build_mapping<N>(
    descriptor: &Descriptor,
    num_layers: usize,
    available: &N,
) -> Result<ResolvedMapping, MappingError>
where
    N: NameSet + ?Sized,
{
    build_mapping_with(descriptor, num_layers, available, &mut NoopObserver)
}

/// [`build_mapping`] with a diagnostic hook for redundant names and skipped
/// optional entries.
pub fn build_mapping_with<N, O>(
    descriptor: &Descriptor,
    num_layers: usize,
    available: &N,
    observer: &mut O,
) -> Result<ResolvedMapping, MappingError>
where
    N: NameSet + ?Sized,
    O: ResolutionObserver + ?Sized,
{
    descriptor.validate()?;
    let entries = expand_validated(descriptor, num_layers)?;

    let mut mapping = ResolvedMapping {
        weights: Vec::with_capacity(entries.len()),
        ..ResolvedMapping::default()
    };
    let mut unresolved = Vec::new();

    for entry in entries {
        match resolve_with(&entry, available, observer) {
            Ok(resolved) => mapping.push(MappedWeight {
                target: entry.name,
                source: resolved.name,
                via: resolved.via,
                is_embed: entry.is_embed,
            }),
            Err(_) if entry.optional => {
                observer.optional_missing(&entry);
                mapping.skipped_optional.push(entry.name);
            }
            Err(err) => unresolved.push(err),
        }
    }

    if !unresolved.is_empty() {
        return Err(MappingError::Unresolved(unresolved));
    }
    Ok(mapping)
}

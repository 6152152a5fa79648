//! Picks the literal source name to read for one concrete entry.
//!
//! Candidates are tried in a fixed order: the canonical name, then aliases in
//! declared order, then tied names. The first candidate present in the source
//! name set wins. Resolution is a pure function of the entry and the name set;
//! redundant naming in the checkpoint is reported through a
//! [`ResolutionObserver`] rather than treated as an error.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};

use serde::Serialize;

use crate::descriptor::WeightEntry;
use crate::errors::ResolutionError;

/// The set of tensor names a source checkpoint actually holds.
pub trait NameSet {
    fn contains_name(&self, name: &str) -> bool;
}

impl<T, S> NameSet for HashSet<T, S>
where
    T: Borrow<str> + Hash + Eq,
    S: BuildHasher,
{
    fn contains_name(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl<T> NameSet for BTreeSet<T>
where
    T: Borrow<str> + Ord,
{
    fn contains_name(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Sharded checkpoints index tensors as `name -> shard file`.
impl<K, V, S> NameSet for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    S: BuildHasher,
{
    fn contains_name(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl<K, V> NameSet for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
{
    fn contains_name(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl<T: NameSet + ?Sized> NameSet for &T {
    fn contains_name(&self, name: &str) -> bool {
        (**self).contains_name(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum ResolvedVia {
    Canonical,
    /// Position in the entry's alias list.
    Alias(usize),
    /// Position in the entry's tied name list.
    Tied(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedName {
    pub name: String,
    pub via: ResolvedVia,
}

/// Diagnostic hook invoked during resolution.
///
/// All methods default to doing nothing.
pub trait ResolutionObserver {
    /// More than one of the entry's canonical name and aliases is present.
    /// `chosen` is the name that will be read; `shadowed` are the others found.
    fn redundant_names(&mut self, entry: &WeightEntry, chosen: &str, shadowed: &[&str]) {
        let _ = (entry, chosen, shadowed);
    }

    /// An optional entry had no candidate in the source checkpoint.
    fn optional_missing(&mut self, entry: &WeightEntry) {
        let _ = entry;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ResolutionObserver for NoopObserver {}

/// One entry for which the checkpoint carries several accepted names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redundancy {
    pub target: String,
    pub chosen: String,
    pub shadowed: Vec<String>,
}

/// Collects every diagnostic for inspection after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedundancyReport {
    redundancies: Vec<Redundancy>,
    missing_optional: Vec<String>,
}

impl RedundancyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.redundancies.is_empty() && self.missing_optional.is_empty()
    }

    pub fn redundancies(&self) -> &[Redundancy] {
        &self.redundancies
    }

    pub fn missing_optional(&self) -> &[String] {
        &self.missing_optional
    }
}

impl ResolutionObserver for RedundancyReport {
    fn redundant_names(&mut self, entry: &WeightEntry, chosen: &str, shadowed: &[&str]) {
        self.redundancies.push(Redundancy {
            target: entry.name.clone(),
            chosen: chosen.to_string(),
            shadowed: shadowed.iter().map(|name| name.to_string()).collect(),
        });
    }

    fn optional_missing(&mut self, entry: &WeightEntry) {
        self.missing_optional.push(entry.name.clone());
    }
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ResolutionObserver for LogObserver {
    fn redundant_names(&mut self, entry: &WeightEntry, chosen: &str, shadowed: &[&str]) {
        log::warn!(
            "checkpoint holds several names for '{}': reading '{}', ignoring {:?}",
            entry.name,
            chosen,
            shadowed
        );
    }

    fn optional_missing(&mut self, entry: &WeightEntry) {
        log::debug!("optional weight '{}' absent from checkpoint", entry.name);
    }
}

pub fn resolve<N>(entry: &WeightEntry, available: &N) -> Result<ResolvedName, ResolutionError>
where
    N: NameSet + ?Sized,
{
    resolve_with(entry, available, &mut NoopObserver)
}

pub fn resolve_with<N, O>(
    entry: &WeightEntry,
    available: &N,
    observer: &mut O,
) -> Result<ResolvedName, ResolutionError>
where
    N: NameSet + ?Sized,
    O: ResolutionObserver + ?Sized,
{
    let mut present = entry
        .names()
        .enumerate()
        .filter(|(_, name)| available.contains_name(name));

    if let Some((position, chosen)) = present.next() {
        let shadowed: Vec<&str> = present.map(|(_, name)| name).collect();
        if !shadowed.is_empty() {
            observer.redundant_names(entry, chosen, &shadowed);
        }
        let via = match position {
            0 => ResolvedVia::Canonical,
            n => ResolvedVia::Alias(n - 1),
        };
        return Ok(ResolvedName {
            name: chosen.to_string(),
            via,
        });
    }

    if let Some((position, tied)) = entry
        .tied_names
        .iter()
        .enumerate()
        .find(|(_, name)| available.contains_name(name))
    {
        return Ok(ResolvedName {
            name: tied.clone(),
            via: ResolvedVia::Tied(position),
        });
    }

    Err(ResolutionError::NotFound {
        name: entry.name.clone(),
        tried: entry
            .aliases
            .iter()
            .chain(entry.tied_names.iter())
            .cloned()
            .collect(),
    })
}

//! Checkpoint weight-name resolution driven by architecture descriptors.
//!
//! A [`Descriptor`] lists every parameter of a model family: fixed weights
//! before the repeated blocks, per-layer templates carrying a
//! `${layer_index}` placeholder, and fixed weights after. Given a layer count
//! and the names a source checkpoint actually holds, [`build_mapping`] produces
//! a [`ResolvedMapping`] from each expected target name to the literal source
//! name to read, honouring aliases and tied names.
//!
//! # Pipeline
//!
//! `validate` → [`expand`] → [`resolve`] per entry → [`ResolvedMapping`].
//! Structural problems stop the run immediately. Missing tensors are collected
//! so that [`MappingError::Unresolved`] lists all of them at once.
//!
//! # Collaborators
//!
//! The engine takes parsed values and performs no I/O. The [`loader`] module
//! covers the file side: descriptor files (JSON or TOML), the layer count from
//! a model's `config.json`, and checkpoint name lists. Descriptors bundled with
//! the crate live in [`builtin`].
//!
//! # Thread Safety
//!
//! Every call is independent and borrows its inputs read-only; descriptors and
//! mappings are `Send + Sync` and may be shared across threads freely.

pub mod builtin;
pub mod descriptor;
pub mod errors;
pub mod expand;
pub mod fingerprint;
pub mod loader;
pub mod mapping;
pub mod resolve;
pub mod template;

pub use descriptor::{Descriptor, LayerTemplates, WeightEntry, WeightGroup};
pub use errors::{
    DescriptorError, ExpansionError, LoadError, MappingError, PlaceholderIssue, ResolutionError,
    Result,
};
pub use expand::expand;
pub use fingerprint::MappingKey;
pub use loader::{resolve_layer_count, DescriptorCatalog};
pub use mapping::{build_mapping, build_mapping_with, MappedWeight, ResolvedMapping};
pub use resolve::{
    resolve, resolve_with, LogObserver, NameSet, NoopObserver, Redundancy, RedundancyReport,
    ResolutionObserver, ResolvedName, ResolvedVia,
};
pub use template::{LayerTemplate, NameTemplate, LAYER_INDEX_PLACEHOLDER};

/// Resolves the layer count from `model_config` via the descriptor's
/// `num_layers_config_key`, then builds the mapping.
pub fn build_mapping_from_config<N>(
    descriptor: &Descriptor,
    model_config: &serde_json::Value,
    available: &N,
) -> std::result::Result<ResolvedMapping, MappingError>
where
    N: NameSet + ?Sized,
{
    let num_layers = resolve_layer_count(model_config, descriptor.num_layers_source())?;
    build_mapping(descriptor, num_layers, available)
}

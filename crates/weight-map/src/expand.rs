//! Concrete weight lists from a descriptor and a layer count.
//!
//! Output order is part of the contract: all `pre_weights`, then every layer
//! in ascending index with that layer's templates in declared order, then all
//! `post_weights`. Consumers rely on each layer's entries being contiguous.

use crate::descriptor::{check_collisions, Descriptor, WeightEntry};
use crate::errors::{DescriptorError, ExpansionError};
use crate::template::LayerTemplate;

/// Validates `descriptor` and expands it for `num_layers` layers.
pub fn expand(
    descriptor: &Descriptor,
    num_layers: usize,
) -> Result<Vec<WeightEntry>, ExpansionError> {
    descriptor.validate()?;
    expand_validated(descriptor, num_layers)
}

/// Expansion for a descriptor that already passed [`Descriptor::validate`].
pub(crate) fn expand_validated(
    descriptor: &Descriptor,
    num_layers: usize,
) -> Result<Vec<WeightEntry>, ExpansionError> {
    let templates = descriptor
        .layer_templates
        .weights
        .iter()
        .map(LayerTemplate::compile)
        .collect::<Result<Vec<_>, DescriptorError>>()?;

    let capacity = descriptor
        .expanded_len(num_layers)
        .ok_or(ExpansionError::CapacityOverflow { num_layers })?;
    let mut entries = Vec::new();
    entries
        .try_reserve_exact(capacity)
        .map_err(|_| ExpansionError::CapacityOverflow { num_layers })?;

    entries.extend(descriptor.pre_weights.iter().cloned());
    // Work is bounded by `num_layers * templates.len()`.
    if !templates.is_empty() {
        for layer_index in 0..num_layers {
            entries.extend(
                templates
                    .iter()
                    .map(|template| template.instantiate(layer_index)),
            );
        }
    }
    entries.extend(descriptor.post_weights.iter().cloned());

    check_collisions(&entries).map_err(|err| match err.colliding_name() {
        Some(name) => ExpansionError::PostExpansionDuplicate(name.to_string()),
        None => ExpansionError::Descriptor(err),
    })?;

    Ok(entries)
}

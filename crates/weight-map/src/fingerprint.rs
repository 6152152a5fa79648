//! Cache keys for callers that memoize mapping results.
//!
//! The engine keeps no cache of its own. A key is the SHA-256 of the
//! descriptor's JSON form, the layer count and the sorted, de-duplicated source
//! names, so two runs with equal inputs share a key regardless of the order in
//! which the name set was iterated.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::descriptor::Descriptor;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MappingKey(String);

impl MappingKey {
    pub fn compute<'a, I>(
        descriptor: &Descriptor,
        num_layers: usize,
        names: I,
    ) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(descriptor)?);
        hasher.update([0u8]);
        hasher.update((num_layers as u64).to_le_bytes());

        let mut sorted: Vec<&str> = names.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        for name in sorted {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }

        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

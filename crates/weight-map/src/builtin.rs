//! Descriptors compiled into the crate.

use crate::descriptor::Descriptor;
use crate::errors::{LoadError, Result};

const DISTILBERT: &str = include_str!("../descriptors/distilbert.json");

pub const NAMES: &[&str] = &["distilbert"];

/// Raw descriptor text for a built-in name.
pub fn source(name: &str) -> Option<&'static str> {
    match name {
        "distilbert" => Some(DISTILBERT),
        _ => None,
    }
}

pub fn descriptor(name: &str) -> Result<Descriptor> {
    let contents = source(name).ok_or_else(|| LoadError::UnknownBuiltin(name.to_string()))?;
    Descriptor::from_json_str(contents)
}

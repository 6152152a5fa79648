use std::collections::HashSet;

use weight_map::{
    build_mapping, expand, resolve, Descriptor, MappingError, ResolutionError, ResolvedVia,
    WeightEntry,
};

fn names(items: &[&str]) -> HashSet<String> {
    items.iter().map(|name| name.to_string()).collect()
}

fn single_template() -> Descriptor {
    let mut descriptor = Descriptor::new("toy", "n_layers");
    descriptor.pre_weights = vec![WeightEntry::new("A")];
    descriptor.layer_templates.weights = vec![WeightEntry::new("L.${layer_index}.w")];
    descriptor
}

#[test]
fn two_layers_fully_present() {
    let mapping = build_mapping(&single_template(), 2, &names(&["A", "L.0.w", "L.1.w"]))
        .expect("all names present");

    let pairs: Vec<(&str, &str)> = mapping
        .iter()
        .map(|weight| (weight.target.as_str(), weight.source.as_str()))
        .collect();
    assert_eq!(pairs, [("A", "A"), ("L.0.w", "L.0.w"), ("L.1.w", "L.1.w")]);
    assert!(mapping.iter().all(|weight| weight.via == ResolvedVia::Canonical));
}

#[test]
fn missing_layer_weight_is_the_only_failure() {
    let err = build_mapping(&single_template(), 2, &names(&["A", "L.0.w"])).unwrap_err();
    assert_eq!(
        err,
        MappingError::Unresolved(vec![ResolutionError::NotFound {
            name: "L.1.w".into(),
            tried: Vec::new(),
        }])
    );
}

#[test]
fn alias_resolves_when_canonical_absent() {
    let entry = WeightEntry::new("X.weight").with_aliases(["X.beta"]);
    let resolved = resolve(&entry, &names(&["X.beta"])).unwrap();
    assert_eq!(resolved.name, "X.beta");
}

#[test]
fn zero_layers_maps_fixed_groups_only() {
    let mut descriptor = Descriptor::new("toy", "n_layers");
    descriptor.pre_weights = vec![WeightEntry::new("embed")];
    descriptor.post_weights = vec![WeightEntry::new("head")];

    let mapping = build_mapping(&descriptor, 0, &names(&["embed", "head"])).unwrap();
    let targets: Vec<_> = mapping.iter().map(|w| w.target.as_str()).collect();
    assert_eq!(targets, ["embed", "head"]);
}

#[test]
fn zero_layers_ignores_templates() {
    let entries = expand(&single_template(), 0).unwrap();
    assert_eq!(entries, vec![WeightEntry::new("A")]);
}

#[test]
fn aggregate_error_message_lists_each_entry() {
    let err = build_mapping(&single_template(), 3, &names(&[])).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("4 weight(s) could not be resolved"));
    for name in ["'A'", "'L.0.w'", "'L.1.w'", "'L.2.w'"] {
        assert!(message.contains(name), "missing {name} in {message}");
    }
}

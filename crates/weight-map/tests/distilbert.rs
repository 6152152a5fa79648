use std::collections::BTreeSet;

use serde_json::json;
use weight_map::{
    build_mapping, build_mapping_from_config, build_mapping_with, builtin, DescriptorCatalog,
    ExpansionError, MappingError, RedundancyReport, ResolvedVia,
};

const LAYER_SUFFIXES: [&str; 16] = [
    "attention.k_lin.weight",
    "attention.k_lin.bias",
    "attention.q_lin.weight",
    "attention.q_lin.bias",
    "attention.v_lin.weight",
    "attention.v_lin.bias",
    "attention.out_lin.weight",
    "attention.out_lin.bias",
    "sa_layer_norm.bias",
    "sa_layer_norm.weight",
    "ffn.lin1.weight",
    "ffn.lin1.bias",
    "ffn.lin2.weight",
    "ffn.lin2.bias",
    "output_layer_norm.bias",
    "output_layer_norm.weight",
];

/// Names of a DistilBERT checkpoint saved with the older gamma/beta layer norms.
fn legacy_checkpoint(layers: usize) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = [
        "distilbert.embeddings.position_embeddings.weight",
        "distilbert.embeddings.word_embeddings.weight",
        "distilbert.embeddings.LayerNorm.gamma",
        "distilbert.embeddings.LayerNorm.beta",
        "pre_classifier.weight",
        "pre_classifier.bias",
        "classifier.weight",
        "classifier.bias",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    for layer in 0..layers {
        for suffix in LAYER_SUFFIXES {
            let suffix = suffix
                .replace("layer_norm.weight", "layer_norm.gamma")
                .replace("layer_norm.bias", "layer_norm.beta");
            names.insert(format!("distilbert.transformer.layer.{layer}.{suffix}"));
        }
    }
    names
}

#[test]
fn six_layer_legacy_checkpoint_resolves_through_aliases() {
    let descriptor = builtin::descriptor("distilbert").unwrap();
    let available = legacy_checkpoint(6);

    let mapping = build_mapping(&descriptor, 6, &available).unwrap();

    assert_eq!(mapping.len(), 4 + 6 * 16 + 4);
    assert_eq!(
        mapping.source_for("distilbert.embeddings.LayerNorm.weight"),
        Some("distilbert.embeddings.LayerNorm.gamma")
    );
    let ln = mapping
        .get("distilbert.transformer.layer.5.output_layer_norm.bias")
        .unwrap();
    assert_eq!(ln.source, "distilbert.transformer.layer.5.output_layer_norm.beta");
    assert_eq!(ln.via, ResolvedVia::Alias(0));

    let embeds: Vec<_> = mapping.embeddings().map(|w| w.target.as_str()).collect();
    assert_eq!(embeds, ["distilbert.embeddings.word_embeddings.weight"]);
}

#[test]
fn layer_entries_are_grouped_per_layer() {
    let descriptor = builtin::descriptor("distilbert").unwrap();
    let mapping = build_mapping(&descriptor, 2, &legacy_checkpoint(2)).unwrap();
    let targets: Vec<_> = mapping.iter().map(|w| w.target.as_str()).collect();

    for (offset, suffix) in LAYER_SUFFIXES.iter().enumerate() {
        assert_eq!(
            targets[4 + offset],
            format!("distilbert.transformer.layer.0.{suffix}")
        );
        assert_eq!(
            targets[4 + 16 + offset],
            format!("distilbert.transformer.layer.1.{suffix}")
        );
    }
    assert_eq!(targets.last(), Some(&"classifier.bias"));
}

#[test]
fn checkpoint_with_both_spellings_is_flagged() {
    let descriptor = builtin::descriptor("distilbert").unwrap();
    let mut available = legacy_checkpoint(1);
    available.insert("distilbert.embeddings.LayerNorm.weight".to_string());

    let mut report = RedundancyReport::new();
    let mapping = build_mapping_with(&descriptor, 1, &available, &mut report).unwrap();

    assert_eq!(
        mapping.source_for("distilbert.embeddings.LayerNorm.weight"),
        Some("distilbert.embeddings.LayerNorm.weight")
    );
    assert_eq!(report.redundancies().len(), 1);
    assert_eq!(
        report.redundancies()[0].shadowed,
        ["distilbert.embeddings.LayerNorm.gamma"]
    );
}

#[test]
fn layer_count_comes_from_model_config() {
    let descriptor = builtin::descriptor("distilbert").unwrap();
    let config = json!({"model_type": "distilbert", "n_layers": 3, "dim": 768});

    let mapping = build_mapping_from_config(&descriptor, &config, &legacy_checkpoint(3)).unwrap();
    assert_eq!(mapping.len(), 8 + 3 * 16);

    let err =
        build_mapping_from_config(&descriptor, &json!({}), &legacy_checkpoint(3)).unwrap_err();
    assert_eq!(
        err,
        MappingError::Expansion(ExpansionError::NegativeOrMissingLayerCount {
            key: "n_layers".into(),
            found: "nothing".into(),
        })
    );
}

#[test]
fn builtin_catalog_finds_by_architecture() {
    let catalog = DescriptorCatalog::builtin().unwrap();
    let found = catalog
        .find(&["BertModel", "DistilBertForSequenceClassification"])
        .unwrap();
    assert_eq!(found.model_type, "distilbert");
    assert!(catalog.find(&["LlamaForCausalLM"]).is_none());
}

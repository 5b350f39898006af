//! Property-based tests for key folding, tier precedence and merging.

use crate::instance::Instance;
use crate::key::KeyPath;
use crate::store::{merge_into, ValueStore};
use crate::value::{Map, Value};
use proptest::prelude::*;

// Strategy for dotted keys of one to four segments
fn key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z][a-zA-Z0-9_]{0,8}", 1..=4).prop_map(|segments| segments.join("."))
}

// Strategy for flat mappings with string leaves
fn flat_map_strategy() -> impl Strategy<Value = Map> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 1000,
        .. ProptestConfig::default()
    })]

    // Case variants of a key normalize to the same path
    #[test]
    fn key_case_variants_equal(raw in key_strategy()) {
        prop_assert_eq!(KeyPath::new(&raw), KeyPath::new(&raw.to_uppercase()));
        prop_assert_eq!(KeyPath::new(&raw), KeyPath::new(&raw.to_lowercase()));
        prop_assert_eq!(KeyPath::new(&raw).to_string(), raw);
    }

    // A value written under one spelling is read back under any other
    #[test]
    fn set_get_case_insensitive(raw in key_strategy(), value in "[a-z0-9]{0,10}") {
        let config = Instance::new();
        config.set(&raw, value.as_str()).unwrap();
        prop_assert_eq!(config.get_string(&raw.to_uppercase()), value);
    }

    // The highest tier holding a value wins, whatever the call order
    #[test]
    fn precedence_independent_of_order(
        default in prop::option::of("[a-z]{1,5}"),
        file in prop::option::of("[a-z]{1,5}"),
        over in prop::option::of("[a-z]{1,5}"),
        reversed in any::<bool>()
    ) {
        let config = Instance::new();
        config.set_config_type("json");

        let mut steps: Vec<Box<dyn Fn(&Instance)>> = Vec::new();
        if let Some(v) = default.clone() {
            steps.push(Box::new(move |c| c.set_default("key", v.as_str()).unwrap()));
        }
        if let Some(v) = file.clone() {
            steps.push(Box::new(move |c| {
                c.read_config(format!("{{\"key\": \"{v}\"}}").as_bytes()).unwrap();
            }));
        }
        if let Some(v) = over.clone() {
            steps.push(Box::new(move |c| c.set("key", v.as_str()).unwrap()));
        }
        if reversed {
            steps.reverse();
        }
        for step in &steps {
            step(&config);
        }

        let expected = over.or(file).or(default);
        prop_assert_eq!(config.get("key").and_then(|v| v.as_str().map(str::to_string)), expected);
    }

    // Merged leaves come from the source whenever it has them
    #[test]
    fn merge_source_wins(target in flat_map_strategy(), source in flat_map_strategy()) {
        let mut merged = target.clone();
        merge_into(&mut merged, source.clone());

        for (key, value) in &source {
            prop_assert_eq!(merged.get(key), Some(value));
        }
        for (key, value) in &target {
            if !source.contains_key(key) {
                prop_assert_eq!(merged.get(key), Some(value));
            }
        }
    }

    // Every leaf written to a store is listed by leaf_keys
    #[test]
    fn leaf_keys_cover_writes(entries in flat_map_strategy()) {
        let mut store = ValueStore::new();
        for (key, value) in &entries {
            store.set(&KeyPath::new(&format!("root.{key}")), value.clone()).unwrap();
        }
        let leaves: Vec<String> = store.leaf_keys().iter().map(KeyPath::canonical).collect();
        let expected: Vec<String> = entries.keys().map(|k| format!("root.{k}")).collect();
        prop_assert_eq!(leaves, expected);
    }
}

//! Property tests: whatever is written is read back unchanged.

use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::{Map, Value};
use statekeep::store::{JsonFile, StoreOptions};
use tempfile::TempDir;

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        "\\PC{0,16}".prop_map(Value::from),
    ];

    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn write_then_read_is_identity(value in arb_json(), indent in 0usize..5) {
        let temp = TempDir::new().unwrap();
        let file = JsonFile::new(
            temp.path().join("value.json"),
            StoreOptions::default().with_indent(indent),
        )
        .unwrap();

        file.write(&value).unwrap();
        prop_assert_eq!(file.read().unwrap(), value.clone());
        prop_assert_eq!(file.read_once().unwrap(), value);
    }

    #[test]
    fn output_always_ends_with_newline(value in arb_json()) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("value.json");
        let file = JsonFile::new(&path, StoreOptions::default()).unwrap();

        file.write_once(&value).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        prop_assert!(raw.ends_with('\n'));
    }
}

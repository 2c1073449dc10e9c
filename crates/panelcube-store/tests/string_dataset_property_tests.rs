use panelcube_store::{
    read_string_dataset, truncate_to_width, DatasetSpec, DatasetStore, MemoryStore, NpyDirStore,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn truncation_is_a_char_aligned_prefix(value in "\\PC{0,12}", width in 0usize..16) {
        let cut = truncate_to_width(&value, width);
        prop_assert!(cut.len() <= width);
        prop_assert!(value.starts_with(cut));
        // Nothing more fits: the next char would cross the width.
        if let Some(next) = value[cut.len()..].chars().next() {
            prop_assert!(cut.len() + next.len_utf8() > width);
        }
    }

    #[test]
    fn stores_agree_on_string_datasets(
        labels in prop::collection::vec("[a-z0-9é]{0,10}", 0..12),
        width in 1usize..8,
    ) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("out");
        let spec = DatasetSpec::fixed_string(vec![labels.len(), 1], width);

        let mut disk = NpyDirStore::create(&root, false).expect("create store");
        disk.create_group("key").expect("group");
        disk.create_dataset("key/values", spec.clone()).expect("dataset");
        disk.write_strings("key/values", &labels).expect("write strings");
        disk.finish().expect("finish");

        let mut memory = MemoryStore::new();
        memory.create_group("key").expect("group");
        memory.create_dataset("key/values", spec).expect("dataset");
        memory.write_strings("key/values", &labels).expect("write strings");

        let expected: Vec<String> = labels
            .iter()
            .map(|l| truncate_to_width(l, width).to_string())
            .collect();
        let (shape, back) = read_string_dataset(&root, "key/values").expect("read back");
        prop_assert_eq!(shape, vec![labels.len(), 1]);
        prop_assert_eq!(&back, &expected);
        prop_assert_eq!(memory.strings("key/values").expect("strings"), expected.as_slice());
    }
}

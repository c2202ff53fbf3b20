#![no_main]

use libfuzzer_sys::fuzz_target;
use subset_lab::key::encode;
use subset_lab::selection::SubsetSelection;

fuzz_target!(|data: &[u8]| {
    // Arbitrary dataset<N> maps either decode to a gap-free selection or fail
    if let Ok(selection) = serde_json::from_slice::<SubsetSelection>(data) {
        let key = encode(&selection);
        assert_eq!(key.subset_count(), selection.len());
    }
});

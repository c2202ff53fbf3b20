#![no_main]

use libfuzzer_sys::fuzz_target;
use subset_lab::table::PerformanceTable;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed tables must be rejected with an error, never a panic
        if let Ok(table) = PerformanceTable::from_json_str(input) {
            for record in table.records() {
                let _ = table.lookup(&record.key);
            }
        }
    }
});

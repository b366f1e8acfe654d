#![no_main]

use libfuzzer_sys::fuzz_target;
use nvdmirror_vuln_matcher::parse_inventory;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        let _ = parse_inventory(json, "fuzz/inventory.json");
    }
});

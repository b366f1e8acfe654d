#![no_main]

use libfuzzer_sys::fuzz_target;
use nvdmirror_feed_sync::parse_feed;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data) {
        if let Ok(page) = parse_feed(body) {
            // 후보 행은 항상 버전 범위를 하나 이상 가짐
            for record in &page.records {
                assert!(record.bounds.has_any());
                assert!(!record.criteria.contains("firmware"));
            }
        }
    }
});

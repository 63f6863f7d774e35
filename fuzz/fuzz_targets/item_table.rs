#![no_main]

use libfuzzer_sys::fuzz_target;
use ratingshift::config::RatingScale;
use ratingshift::dataset::{read_csv, Dataset};

fuzz_target!(|data: &[u8]| {
    // Parsing and validation must reject bad tables without panicking
    if let Ok(records) = read_csv(data) {
        let _ = Dataset::new(records, &RatingScale { min: 0.0, max: 10.0 });
    }
});

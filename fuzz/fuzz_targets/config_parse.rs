//! Fuzz target for backend configuration parsing
//!
//! Tests that the TOML loader and validator handle arbitrary input.

#![no_main]

use carapace_backend::SoftConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = SoftConfig::from_toml_str(text) {
        let _ = config.validate();
        if let Ok(serialized) = config.to_toml_string() {
            let reparsed = SoftConfig::from_toml_str(&serialized).expect("reparse failed");
            assert_eq!(reparsed, config);
        }
    }
});

#![no_main]

use certreq_core::TokenValidator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let validator = TokenValidator::new(b"fuzz-secret-fuzz-secret-fuzz-secret!");
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    assert!(!validator.validate(Some(raw)));
    let prefixed = format!("Bearer {raw}");
    assert!(!validator.validate(Some(&prefixed)));
});

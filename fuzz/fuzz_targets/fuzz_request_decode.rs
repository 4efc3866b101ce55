#![no_main]

use certreq_core::CertificationRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_json::from_slice::<CertificationRequest>(data) else {
        return;
    };
    let valid = request.validate().is_ok();
    assert_eq!(
        valid,
        !request.request_type.trim().is_empty() && !request.student_subject_id.trim().is_empty()
    );
});

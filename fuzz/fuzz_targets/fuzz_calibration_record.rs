#![no_main]
use libfuzzer_sys::fuzz_target;
use rig_core::calibration::{Calibration, RECORD_LEN};

fuzz_target!(|record: [u8; RECORD_LEN]| {
    // Any record that decodes must re-encode to the same bytes.
    if let Some(cal) = Calibration::decode(&record) {
        assert_eq!(cal.encode(), record);
    }
});

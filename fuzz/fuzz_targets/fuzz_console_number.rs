#![no_main]
use libfuzzer_sys::fuzz_target;
use rig_core::console::scan_f64;
use rig_core::mocks::ScriptedPort;

fuzz_target!(|data: &[u8]| {
    // Arbitrary keystrokes: entry either parses, is rejected, or runs out of input.
    let mut port = ScriptedPort::new(data);
    while port.pending() > 0 {
        if scan_f64(&mut port).is_err() && port.pending() == 0 {
            break;
        }
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use refcheck_core::FormState;

fuzz_target!(|data: &[u8]| {
    // Any input either fails to parse or round-trips.
    if let Ok(state) = serde_json::from_slice::<FormState>(data) {
        let json = serde_json::to_vec(&state).unwrap();
        let back: FormState = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, state);
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use refcheck_core::config::CheckConfig;
use refcheck_core::dates::parse_date_prefix;
use refcheck_core::raw::RawSnapshot;
use refcheck_core::{FixedClock, FormState, ReferenceStore};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<RawSnapshot>(data) else {
        return;
    };
    let today = FixedClock(parse_date_prefix("2025-06-15").unwrap());
    let mut store = ReferenceStore::with_clock(FormState::default(), CheckConfig::default(), today);

    let first = store.reconcile(&raw).clone();
    let second = store.reconcile(&raw).clone();
    assert_eq!(first, second);

    // Gap derivation must cope with whatever dates came through.
    let _ = store.gaps();

    // The reconciled snapshot must survive persistence.
    let json = serde_json::to_vec(second.as_ref()).unwrap();
    let back: FormState = serde_json::from_slice(&json).unwrap();
    assert_eq!(&back, second.as_ref());
});

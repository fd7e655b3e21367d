#![no_main]

use std::cmp::Ordering;

use libfuzzer_sys::fuzz_target;
use qaboard_sync::{
    compare_questions, decode_push_frame, ordered_questions, total_pages, ReconciliationStore,
    UnknownUpdatePolicy,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let policy = if data.first().is_some_and(|byte| byte % 2 == 0) {
        UnknownUpdatePolicy::Drop
    } else {
        UnknownUpdatePolicy::Insert
    };
    let mut store = ReconciliationStore::new(policy);
    store.load_snapshot(Vec::new());

    for line in raw.lines() {
        let Ok(event) = decode_push_frame(line) else {
            continue;
        };
        store.apply_push_event(event);
    }

    let ordered = ordered_questions(&store);
    assert_eq!(ordered.len(), store.len());
    for pair in ordered.windows(2) {
        assert_ne!(compare_questions(pair[0], pair[1]), Ordering::Greater);
    }
    assert!(total_pages(store.len(), 10) >= 1);
});

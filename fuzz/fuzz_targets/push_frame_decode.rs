#![no_main]

use libfuzzer_sys::fuzz_target;
use qaboard_sync::{decode_push_bytes, decode_push_frame, truncate_frame_for_log, PushEvent};

fuzz_target!(|data: &[u8]| {
    let from_bytes = decode_push_bytes(data);
    if let Ok(raw) = std::str::from_utf8(data) {
        let from_text = decode_push_frame(raw);
        assert_eq!(from_bytes.is_ok(), from_text.is_ok());
        let truncated = truncate_frame_for_log(raw, 64);
        assert!(truncated.chars().count() <= 67);
    } else {
        assert!(from_bytes.is_err());
    }

    if let Ok(event) = from_bytes {
        match &event {
            PushEvent::NewQuestion(question) | PushEvent::QuestionUpdated(question) => {
                assert!(!event.kind().as_str().is_empty());
                let _ = question.answered_after_escalation();
            }
            PushEvent::NewAnswer(appended) => {
                let _ = appended.answer.id;
            }
        }
    }
});

//! Client-side synchronization engine for the live Q&A board.
//!
//! A one-shot snapshot seeds the [`ReconciliationStore`]; decoded push
//! events are layered on top of it one at a time; [`BoardView`] derives the
//! display order and pages from whatever the store currently holds.
//!
//! ```rust
//! use qaboard_sync::{decode_push_frame, BoardView, ReconciliationStore, UnknownUpdatePolicy};
//!
//! let mut store = ReconciliationStore::new(UnknownUpdatePolicy::Drop);
//! store.load_snapshot(Vec::new());
//!
//! let event = decode_push_frame(
//!     r#"{"type":"NEW_QUESTION","payload":{"id":1,"message":"hi","status":"pending","created_at":"2024-05-01T10:00:00"}}"#,
//! )
//! .expect("valid frame");
//! store.apply_push_event(event);
//!
//! let mut view = BoardView::default();
//! let page = view.current_page(&store);
//! assert_eq!(page.total_count, 1);
//! assert_eq!(page.questions[0].message, "hi");
//! ```

pub mod drafts;
pub mod model;
pub mod push_event;
pub mod store;
pub mod view;

pub use drafts::{AnswerDrafts, AnswerSubmission, DraftError, QuestionComposer, QuestionSubmission};
pub use model::{Answer, AnswerAppended, AnswerId, Question, QuestionId, QuestionStatus};
pub use push_event::{
    decode_push_bytes, decode_push_frame, truncate_frame_for_log, PushDecodeError, PushEvent,
    PushEventKind,
};
pub use store::{
    AppendOutcome, AppliedEvent, InsertOutcome, OptimisticOutcome, PendingTransition,
    ReconciliationStore, ReplaceOutcome, TransitionResolution, UnknownUpdatePolicy,
};
pub use view::{
    clamp_page, compare_questions, ordered_questions, page_slice, status_weight, total_pages,
    BoardPage, BoardView, DEFAULT_PAGE_SIZE,
};

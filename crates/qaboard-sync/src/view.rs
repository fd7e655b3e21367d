//! Derived ordering and pagination over the reconciliation store.
//!
//! Order: escalated first, then every status that is neither escalated nor
//! answered, then answered. Inside a bucket, newest `created_at` instant
//! first. Timestamps that cannot be parsed sink to the end of their bucket.
//! Remaining ties fall back to arrival order, then identity, so the order
//! is total.

use std::cmp::{Ordering, Reverse};

use qaboard_core::parse_timestamp_unix_ms;

use crate::model::{Question, QuestionId, QuestionStatus};
use crate::store::ReconciliationStore;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sort weight of a status; lower sorts first.
pub fn status_weight(status: &QuestionStatus) -> u8 {
    match status {
        QuestionStatus::Escalated => 0,
        QuestionStatus::Answered => 2,
        QuestionStatus::Pending | QuestionStatus::Other(_) => 1,
    }
}

type OrderKey = (u8, bool, Reverse<i64>, Reverse<u64>, Reverse<QuestionId>);

fn order_key(question: &Question, arrival_rank: u64) -> OrderKey {
    let created_at = parse_timestamp_unix_ms(&question.created_at);
    (
        status_weight(&question.status),
        created_at.is_none(),
        Reverse(created_at.unwrap_or(i64::MIN)),
        Reverse(arrival_rank),
        Reverse(question.id),
    )
}

/// Compares two questions under the board ordering, ignoring arrival order.
pub fn compare_questions(left: &Question, right: &Question) -> Ordering {
    order_key(left, 0).cmp(&order_key(right, 0))
}

/// Returns the store contents under the board ordering.
pub fn ordered_questions(store: &ReconciliationStore) -> Vec<&Question> {
    let mut ranked = store.iter_ranked().collect::<Vec<_>>();
    ranked.sort_by_cached_key(|(question, arrival_rank)| order_key(question, *arrival_rank));
    ranked.into_iter().map(|(question, _)| question).collect()
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count.div_ceil(page_size).max(1)
}

/// Clamps a 1-based page index into `[1, total_pages]`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Items on 1-based `page`; empty when the page lies past the end.
pub fn page_slice<T>(ordered: &[T], page: usize, page_size: usize) -> &[T] {
    let page_size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= ordered.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(ordered.len());
    &ordered[start..end]
}

#[derive(Debug, Clone)]
pub struct BoardPage<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub questions: Vec<&'a Question>,
}

impl BoardPage<'_> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug)]
/// Pagination cursor with an ordering cache keyed on the store revision.
pub struct BoardView {
    page_size: usize,
    page: usize,
    cached_revision: Option<u64>,
    ordered_ids: Vec<QuestionId>,
}

impl Default for BoardView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl BoardView {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
            cached_revision: None,
            ordered_ids: Vec::new(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current 1-based page, as last clamped.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&mut self, store: &ReconciliationStore) -> usize {
        self.refresh(store);
        total_pages(self.ordered_ids.len(), self.page_size)
    }

    /// Ordered identities for the current store contents.
    pub fn ordered_ids(&mut self, store: &ReconciliationStore) -> &[QuestionId] {
        self.refresh(store);
        &self.ordered_ids
    }

    pub fn set_page(&mut self, page: usize, store: &ReconciliationStore) -> usize {
        let total = self.total_pages(store);
        self.page = clamp_page(page, total);
        self.page
    }

    pub fn next_page(&mut self, store: &ReconciliationStore) -> usize {
        self.set_page(self.page.saturating_add(1), store)
    }

    pub fn previous_page(&mut self, store: &ReconciliationStore) -> usize {
        self.set_page(self.page.saturating_sub(1), store)
    }

    pub fn current_page<'s>(&mut self, store: &'s ReconciliationStore) -> BoardPage<'s> {
        self.refresh(store);
        let total_pages = total_pages(self.ordered_ids.len(), self.page_size);
        let questions = page_slice(&self.ordered_ids, self.page, self.page_size)
            .iter()
            .filter_map(|id| store.get(*id))
            .collect();
        BoardPage {
            page: self.page,
            total_pages,
            total_count: self.ordered_ids.len(),
            questions,
        }
    }

    fn refresh(&mut self, store: &ReconciliationStore) {
        if self.cached_revision == Some(store.revision()) {
            return;
        }
        self.ordered_ids = ordered_questions(store)
            .into_iter()
            .map(|question| question.id)
            .collect();
        self.cached_revision = Some(store.revision());
        self.page = clamp_page(
            self.page,
            total_pages(self.ordered_ids.len(), self.page_size),
        );
    }
}

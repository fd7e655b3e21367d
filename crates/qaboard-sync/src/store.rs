//! Reconciliation store: the single authoritative set of questions.
//!
//! All mutation entry points are synchronous and apply exactly one change,
//! so a caller that processes push events one at a time never observes a
//! half-applied event. Records are indexed by identity; every mutation is
//! a hash-map operation.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::model::{Answer, AnswerAppended, Question, QuestionId, QuestionStatus};
use crate::push_event::PushEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// What `replace` does with an update for an identity the store has never seen.
pub enum UnknownUpdatePolicy {
    #[default]
    Drop,
    Insert,
}

impl UnknownUpdatePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Insert => "insert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A locally applied admin transition awaiting its push confirmation.
pub struct PendingTransition {
    pub expected_status: QuestionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResolution {
    Confirmed,
    Overridden {
        expected: QuestionStatus,
        actual: QuestionStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The identity already existed; the new payload replaced it.
    Replaced {
        resolution: Option<TransitionResolution>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced {
        resolution: Option<TransitionResolution>,
    },
    InsertedUnknown,
    DroppedUnknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    DuplicateAnswer,
    MissingQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticOutcome {
    Applied,
    /// A push event for the identity arrived after the caller observed its
    /// push version; the store already holds newer state.
    Superseded,
    UnknownQuestion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of routing one push event through the store.
pub enum AppliedEvent {
    /// The store is not seeded yet; the event waits for the snapshot.
    Buffered,
    Inserted(InsertOutcome),
    Replaced(ReplaceOutcome),
    Appended(AppendOutcome),
}

impl AppliedEvent {
    pub fn changed_store(&self) -> bool {
        match self {
            Self::Buffered => false,
            Self::Inserted(_) => true,
            Self::Replaced(outcome) => !matches!(outcome, ReplaceOutcome::DroppedUnknown),
            Self::Appended(outcome) => matches!(outcome, AppendOutcome::Appended),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredQuestion {
    question: Question,
    /// Larger ranks sit closer to the front of iteration order.
    arrival_rank: u64,
}

#[derive(Debug, Default)]
pub struct ReconciliationStore {
    questions: HashMap<QuestionId, StoredQuestion>,
    pending_transitions: HashMap<QuestionId, PendingTransition>,
    /// Push events routed per identity. Never reset.
    push_versions: HashMap<QuestionId, u64>,
    pre_seed_events: Vec<PushEvent>,
    next_arrival_rank: u64,
    seeded: bool,
    revision: u64,
    unknown_update_policy: UnknownUpdatePolicy,
}

impl ReconciliationStore {
    pub fn new(unknown_update_policy: UnknownUpdatePolicy) -> Self {
        Self {
            unknown_update_policy,
            ..Self::default()
        }
    }

    pub fn unknown_update_policy(&self) -> UnknownUpdatePolicy {
        self.unknown_update_policy
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Monotonic counter bumped on every content change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(&id).map(|stored| &stored.question)
    }

    pub fn contains(&self, id: QuestionId) -> bool {
        self.questions.contains_key(&id)
    }

    pub fn pending_transition(&self, id: QuestionId) -> Option<&PendingTransition> {
        self.pending_transitions.get(&id)
    }

    /// Number of push events routed to `id` since seeding, buffered replays included.
    pub fn push_version(&self, id: QuestionId) -> u64 {
        self.push_versions.get(&id).copied().unwrap_or(0)
    }

    pub fn buffered_event_count(&self) -> usize {
        self.pre_seed_events.len()
    }

    /// Iterates questions with their arrival rank, in no particular order.
    pub fn iter_ranked(&self) -> impl Iterator<Item = (&Question, u64)> {
        self.questions
            .values()
            .map(|stored| (&stored.question, stored.arrival_rank))
    }

    /// Questions most-recently-arrived first: snapshot order for seeded
    /// entries, with later inserts ahead of them.
    pub fn recent_first(&self) -> Vec<&Question> {
        let mut ranked = self.iter_ranked().collect::<Vec<_>>();
        ranked.sort_by(|left, right| right.1.cmp(&left.1));
        ranked.into_iter().map(|(question, _)| question).collect()
    }

    /// Replaces the whole store with `questions` and marks it seeded.
    ///
    /// Calling it again performs another full replace. Events buffered
    /// before the first seed are replayed afterwards in delivery order.
    /// Returns the replay results of those buffered events.
    pub fn load_snapshot(&mut self, questions: Vec<Question>) -> Vec<AppliedEvent> {
        self.questions.clear();
        self.pending_transitions.clear();
        let count = questions.len() as u64;
        let base = self.next_arrival_rank;
        for (index, question) in questions.into_iter().enumerate() {
            let arrival_rank = base + (count - index as u64);
            // Later duplicates in a snapshot overwrite earlier ones.
            self.questions.insert(
                question.id,
                StoredQuestion {
                    question,
                    arrival_rank,
                },
            );
        }
        self.next_arrival_rank = base + count + 1;
        self.seeded = true;
        self.bump_revision();
        debug!(questions = self.questions.len(), "store seeded from snapshot");

        let buffered = std::mem::take(&mut self.pre_seed_events);
        buffered
            .into_iter()
            .map(|event| self.apply_push_event(event))
            .collect()
    }

    /// Adds a question at the front of iteration order, or replaces the
    /// existing record with the same identity.
    pub fn insert(&mut self, question: Question) -> InsertOutcome {
        if self.questions.contains_key(&question.id) {
            let resolution = self.overwrite_existing(question);
            return InsertOutcome::Replaced { resolution };
        }
        let arrival_rank = self.take_arrival_rank();
        self.questions.insert(
            question.id,
            StoredQuestion {
                question,
                arrival_rank,
            },
        );
        self.bump_revision();
        InsertOutcome::Inserted
    }

    /// Swaps the record with the same identity wholesale. Unknown identities
    /// follow the configured `UnknownUpdatePolicy`.
    pub fn replace(&mut self, question: Question) -> ReplaceOutcome {
        if self.questions.contains_key(&question.id) {
            let resolution = self.overwrite_existing(question);
            return ReplaceOutcome::Replaced { resolution };
        }
        match self.unknown_update_policy {
            UnknownUpdatePolicy::Drop => {
                debug!(question_id = question.id, "dropping update for unknown question");
                ReplaceOutcome::DroppedUnknown
            }
            UnknownUpdatePolicy::Insert => {
                self.insert(question);
                ReplaceOutcome::InsertedUnknown
            }
        }
    }

    /// Appends `answer` to question `question_id`. Missing parents and
    /// answer identities already present under the parent are ignored.
    pub fn append_answer(&mut self, question_id: QuestionId, answer: Answer) -> AppendOutcome {
        let Some(stored) = self.questions.get_mut(&question_id) else {
            debug!(question_id, answer_id = answer.id, "dropping answer for unknown question");
            return AppendOutcome::MissingQuestion;
        };
        if stored.question.has_answer(answer.id) {
            return AppendOutcome::DuplicateAnswer;
        }
        stored.question.answers.push(answer);
        self.bump_revision();
        AppendOutcome::Appended
    }

    /// Routes a decoded push event to the matching mutation.
    pub fn apply_push_event(&mut self, event: PushEvent) -> AppliedEvent {
        if !self.seeded {
            self.pre_seed_events.push(event);
            return AppliedEvent::Buffered;
        }
        let version = self.push_versions.entry(event.question_id()).or_insert(0);
        *version = version.wrapping_add(1);
        match event {
            PushEvent::NewQuestion(question) => AppliedEvent::Inserted(self.insert(question)),
            PushEvent::QuestionUpdated(question) => {
                AppliedEvent::Replaced(self.replace(question))
            }
            PushEvent::NewAnswer(AnswerAppended {
                question_id,
                answer,
            }) => AppliedEvent::Appended(self.append_answer(question_id, answer)),
        }
    }

    /// Applies an admin transition ahead of its push event. The next push
    /// update for the same identity wins regardless of what it carries.
    ///
    /// `observed_push_version` is [`Self::push_version`] as read when the
    /// action was sent. If any push event for the identity has been applied
    /// since, the transition is discarded and no pending entry is recorded.
    pub fn apply_optimistic(
        &mut self,
        question: Question,
        observed_push_version: u64,
    ) -> OptimisticOutcome {
        let current_push_version = self.push_version(question.id);
        let Some(stored) = self.questions.get_mut(&question.id) else {
            return OptimisticOutcome::UnknownQuestion;
        };
        if current_push_version != observed_push_version {
            debug!(
                question_id = question.id,
                observed_push_version,
                current_push_version,
                "discarding optimistic transition superseded by push"
            );
            return OptimisticOutcome::Superseded;
        }
        self.pending_transitions.insert(
            question.id,
            PendingTransition {
                expected_status: question.status.clone(),
            },
        );
        stored.question = question;
        self.bump_revision();
        OptimisticOutcome::Applied
    }

    fn overwrite_existing(&mut self, question: Question) -> Option<TransitionResolution> {
        let resolution = self
            .pending_transitions
            .remove(&question.id)
            .map(|pending| {
                if pending.expected_status == question.status {
                    TransitionResolution::Confirmed
                } else {
                    warn!(
                        question_id = question.id,
                        expected = %pending.expected_status,
                        actual = %question.status,
                        "push update overrides optimistic transition"
                    );
                    TransitionResolution::Overridden {
                        expected: pending.expected_status,
                        actual: question.status.clone(),
                    }
                }
            });
        if let Some(stored) = self.questions.get_mut(&question.id) {
            stored.question = question;
        }
        self.bump_revision();
        resolution
    }

    fn take_arrival_rank(&mut self) -> u64 {
        let rank = self.next_arrival_rank;
        self.next_arrival_rank = self.next_arrival_rank.saturating_add(1);
        rank
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

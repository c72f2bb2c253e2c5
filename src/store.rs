//! Persistence seam for questions, choices, votes and users.
//!
//! Handlers talk to a `PollStore` only. `PgStore` (in `web::db`) backs it
//! with PostgreSQL; `MemoryStore` keeps everything in process for tests and
//! local development. All methods are blocking and are called from
//! `spawn_blocking` by the web layer.
mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::voting::{Ballot, Choice, CreateQuestion, Id, Question, User, Vote, VoteChange, WeakId};

pub trait PollStore: Send + Sync {
    /// Up to `limit` questions published at or before `now`, newest first.
    fn latest_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>, StoreError>;

    /// The question with `id`, if it exists and is published at `now`.
    fn published_question(&self, id: WeakId, now: DateTime<Utc>) -> Result<Option<Question>, StoreError>;

    /// Choices of a question ordered by id.
    fn choices(&self, question_id: WeakId) -> Result<Vec<Choice>, StoreError>;

    fn prior_vote(&self, user_id: &Id, question_id: WeakId) -> Result<Option<Vote>, StoreError>;

    /// Records `ballot` for `user_id`, creating or repointing their vote and
    /// adjusting both affected counters as one unit.
    fn cast_vote(&self, user_id: &Id, ballot: &Ballot) -> Result<VoteChange, StoreError>;

    /// Total votes across the question's choices, `None` if no such question.
    fn vote_count(&self, question_id: WeakId) -> Result<Option<i64>, StoreError>;

    /// Questions whose text contains `text`, case-sensitive, ordered by id.
    fn search_questions(&self, text: &str) -> Result<Vec<Question>, StoreError>;

    fn user(&self, id: &Id) -> Result<Option<User>, StoreError>;

    fn add_user(&self, display_name: &str) -> Result<User, StoreError>;

    fn add_question(&self, settings: CreateQuestion) -> Result<(Question, Vec<Choice>), StoreError>;
}

//! In-process store for tests and running without a database.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::PollStore;
use crate::error::{self, StoreError};
use crate::voting::{
    self, Ballot, Choice, CreateQuestion, Id, Question, User, Vote, VoteChange, WeakId,
};

#[derive(Default)]
struct State {
    questions: Vec<Question>,
    choices: Vec<Choice>,
    votes: Vec<Vote>,
    users: HashMap<Id, User>,
    last_id: i32,
}

impl State {
    fn next_id(&mut self) -> WeakId {
        self.last_id += 1;
        WeakId(self.last_id)
    }
}

/// Every ballot is applied under one write lock, so counter updates never
/// interleave.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl PollStore for MemoryStore {
    fn latest_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>, StoreError> {
        let state = self.read()?;
        Ok(voting::latest_published(&state.questions, now, limit))
    }

    fn published_question(&self, id: WeakId, now: DateTime<Utc>) -> Result<Option<Question>, StoreError> {
        let state = self.read()?;
        Ok(state.questions.iter()
            .find(|q| q.id == id && q.is_published(now))
            .cloned())
    }

    fn choices(&self, question_id: WeakId) -> Result<Vec<Choice>, StoreError> {
        let state = self.read()?;
        let mut choices: Vec<Choice> = state.choices.iter()
            .filter(|c| c.question_id == question_id)
            .cloned()
            .collect();
        choices.sort_by_key(|c| c.id);
        Ok(choices)
    }

    fn prior_vote(&self, user_id: &Id, question_id: WeakId) -> Result<Option<Vote>, StoreError> {
        let state = self.read()?;
        Ok(state.votes.iter()
            .find(|v| v.user_id == *user_id && v.question_id == question_id)
            .cloned())
    }

    fn cast_vote(&self, user_id: &Id, ballot: &Ballot) -> Result<VoteChange, StoreError> {
        let mut state = self.write()?;

        if !state.questions.iter().any(|q| q.id == ballot.question_id) {
            return Err(error::missing("question", ballot.question_id));
        }
        if !state.choices.iter().any(|c| c.id == ballot.choice_id && c.question_id == ballot.question_id) {
            return Err(error::missing("choice", ballot.choice_id));
        }

        let prior = state.votes.iter()
            .position(|v| v.user_id == *user_id && v.question_id == ballot.question_id);
        let change = VoteChange::plan(prior.map(|i| state.votes[i].choice_id), ballot.choice_id);
        change.apply(&mut state.choices);

        match prior {
            Some(index) => state.votes[index].choice_id = ballot.choice_id,
            None => {
                let id = state.next_id();
                state.votes.push(Vote {
                    id,
                    user_id: *user_id,
                    question_id: ballot.question_id,
                    choice_id: ballot.choice_id,
                });
            },
        }

        debug!(user = %user_id, %ballot, ?change, "Recorded ballot in memory");
        Ok(change)
    }

    fn vote_count(&self, question_id: WeakId) -> Result<Option<i64>, StoreError> {
        let state = self.read()?;
        if !state.questions.iter().any(|q| q.id == question_id) {
            return Ok(None);
        }
        let choices: Vec<Choice> = state.choices.iter()
            .filter(|c| c.question_id == question_id)
            .cloned()
            .collect();
        Ok(Some(voting::vote_count(&choices)))
    }

    fn search_questions(&self, text: &str) -> Result<Vec<Question>, StoreError> {
        let state = self.read()?;
        let mut found: Vec<Question> = state.questions.iter()
            .filter(|q| q.question_text.contains(text))
            .cloned()
            .collect();
        found.sort_by_key(|q| q.id);
        Ok(found)
    }

    fn user(&self, id: &Id) -> Result<Option<User>, StoreError> {
        let state = self.read()?;
        Ok(state.users.get(id).cloned())
    }

    fn add_user(&self, display_name: &str) -> Result<User, StoreError> {
        let mut state = self.write()?;
        let user = User::new(Id::new(), display_name.to_string());
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn add_question(&self, settings: CreateQuestion) -> Result<(Question, Vec<Choice>), StoreError> {
        let CreateQuestion { question_text, pub_date, choices } = settings;
        let mut state = self.write()?;

        let question = Question { id: state.next_id(), question_text, pub_date };
        let mut created = vec![];
        for choice_text in choices {
            let choice = Choice {
                id: state.next_id(),
                question_id: question.id,
                choice_text,
                votes: 0,
            };
            state.choices.push(choice.clone());
            created.push(choice);
        }
        state.questions.push(question.clone());

        Ok((question, created))
    }
}

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::WeakId;
use crate::error::{self, ValidationError};

/// Number of questions shown on the listing.
pub const LATEST_QUESTION_COUNT: usize = 5;

const QUESTION_TEXT_LIMITS: RangeInclusive<usize> = 1..=200;
const CHOICE_TEXT_LIMITS: RangeInclusive<usize> = 1..=200;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: WeakId,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
}

impl Question {
    /// A question is visible and votable once its publication time has passed.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.pub_date <= now
    }

    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.pub_date && self.pub_date <= now
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: WeakId,
    pub question_id: WeakId,
    pub choice_text: String,
    pub votes: i32,
}

/// Published questions, newest first, capped at `limit`.
pub fn latest_published<'a, I>(questions: I, now: DateTime<Utc>, limit: usize) -> Vec<Question>
where
    I: IntoIterator<Item = &'a Question>,
{
    let mut published: Vec<Question> = questions.into_iter()
        .filter(|q| q.is_published(now))
        .cloned()
        .collect();
    published.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
    published.truncate(limit);
    published
}


#[derive(Clone, Debug)]
pub struct CreateQuestion {
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub choices: Vec<String>,
}

pub struct UnvalidatedCreateQuestion {
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub choices: Vec<String>,
}

impl TryFrom<UnvalidatedCreateQuestion> for CreateQuestion {
    type Error = ValidationError;
    fn try_from(value: UnvalidatedCreateQuestion) -> Result<Self, Self::Error> {
        let UnvalidatedCreateQuestion { question_text, pub_date, choices } = value;

        let len = question_text.trim().chars().count();
        if !QUESTION_TEXT_LIMITS.contains(&len) {
            return Err(error::question_text_invalid_size(QUESTION_TEXT_LIMITS, len));
        }

        for (index, choice) in choices.iter().enumerate() {
            let len = choice.trim().chars().count();
            if !CHOICE_TEXT_LIMITS.contains(&len) {
                return Err(error::choice_text_invalid_size(index, CHOICE_TEXT_LIMITS, len));
            }
        }

        Ok(CreateQuestion { question_text, pub_date, choices })
    }
}

impl CreateQuestion {
    pub fn new(question_text: &str, pub_date: DateTime<Utc>, choices: &[&str]) -> Result<Self, ValidationError> {
        CreateQuestion::try_from(UnvalidatedCreateQuestion {
            question_text: question_text.to_string(),
            pub_date,
            choices: choices.iter().map(|c| c.to_string()).collect(),
        })
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use warp::reply::{self, Reply, Response};
use warp::Rejection;

use super::blocking;
use crate::error::{self, HttpError};
use crate::store::PollStore;
use crate::voting::{Choice, Question, User, WeakId, LATEST_QUESTION_COUNT};

#[derive(Serialize)]
struct ListedQuestion {
    #[serde(flatten)]
    question: Question,
    was_published_recently: bool,
}

#[derive(Serialize)]
struct QuestionList {
    latest_question_list: Vec<ListedQuestion>,
}

#[derive(Serialize)]
struct SearchResults {
    questions: Vec<Question>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Voting form contents: the question, its choices, the principal's
/// current selection, and any error from the last submission.
#[derive(Serialize)]
pub struct QuestionDetail {
    pub question: Question,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<WeakId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Looks up a question visible at `now`; unpublished questions are not found.
pub fn published_question(store: &dyn PollStore, id: WeakId, now: DateTime<Utc>) -> Result<Question, HttpError> {
    store.published_question(id, now)
        .map_err(|err| error::db_get(err, "question", None))?
        .ok_or_else(|| error::not_found("question", id))
}

pub fn question_choices(store: &dyn PollStore, question: &Question) -> Result<Vec<Choice>, HttpError> {
    store.choices(question.id)
        .map_err(|err| error::db_get(err, "choices", Some("question")))
}

/// GET /polls
pub async fn index(store: Arc<dyn PollStore>) -> Result<Response, Rejection> {
    info!("Return questions by date");
    let now = Utc::now();
    let latest = blocking(store, move |store| {
        store.latest_questions(now, LATEST_QUESTION_COUNT)
            .map_err(|err| error::db_get(err, "questions", None))
    }).await?;
    let latest_question_list = latest.into_iter()
        .map(|question| ListedQuestion {
            was_published_recently: question.was_published_recently(now),
            question,
        })
        .collect();

    Ok(reply::json(&QuestionList { latest_question_list }).into_response())
}

/// GET /polls/search?q=
pub async fn search(query: SearchQuery, store: Arc<dyn PollStore>) -> Result<Response, Rejection> {
    let now = Utc::now();
    let questions = blocking(store, move |store| {
        store.search_questions(&query.q)
            .map_err(|err| error::db_get(err, "questions", None))
    }).await?;
    let questions = questions.into_iter()
        .filter(|q| q.is_published(now))
        .collect();

    Ok(reply::json(&SearchResults { questions }).into_response())
}

/// GET /polls/:id
pub async fn detail(id: i32, principal: Option<User>, store: Arc<dyn PollStore>) -> Result<Response, Rejection> {
    let question_id = WeakId(id);
    let now = Utc::now();

    let page = blocking(store, move |store| {
        let question = published_question(store, question_id, now)?;
        let choices = question_choices(store, &question)?;
        let vote = match principal {
            Some(user) => store.prior_vote(&user.id, question_id)
                .map_err(|err| error::db_get(err, "vote", Some("user")))?
                .map(|v| v.choice_id),
            None => None,
        };
        Ok(QuestionDetail { question, choices, vote, error_message: None })
    }).await?;

    Ok(reply::json(&page).into_response())
}

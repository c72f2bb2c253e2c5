use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use warp::reply::{self, Reply, Response};
use warp::Rejection;

use super::question_api::{published_question, question_choices, QuestionDetail};
use super::{blocking, redirect};
use crate::error;
use crate::store::PollStore;
use crate::voting::{Ballot, UnvalidatedBallot, User, WeakId};

const NO_CHOICE_MESSAGE: &str = "You didn't select a choice.";

enum Outcome {
    Recorded,
    Redisplay(QuestionDetail),
}

/// POST /polls/:id/vote
pub async fn vote(
    id: i32,
    principal: Option<User>,
    form: UnvalidatedBallot,
    store: Arc<dyn PollStore>,
    login_url: Arc<str>,
) -> Result<Response, Rejection> {
    let question_id = WeakId(id);
    let vote_path = format!("/polls/{question_id}/vote");

    let user = match principal {
        Some(user) => user,
        None => {
            info!(question = %question_id, "Anonymous vote, redirecting to login");
            let separator = if login_url.contains('?') { '&' } else { '?' };
            return redirect(&format!("{login_url}{separator}next={vote_path}"));
        },
    };

    let now = Utc::now();
    let outcome = blocking(store, move |store| {
        let question = published_question(store, question_id, now)?;
        let choices = question_choices(store, &question)?;

        let ballot = match Ballot::try_from((form, &question, choices.as_slice())) {
            Ok(ballot) => ballot,
            Err(err) => {
                warn!(user = %user.id, error = %err, "Rejected ballot");
                return Ok(Outcome::Redisplay(QuestionDetail {
                    question,
                    choices,
                    vote: None,
                    error_message: Some(NO_CHOICE_MESSAGE.to_string()),
                }));
            },
        };

        let change = store.cast_vote(&user.id, &ballot)
            .map_err(|err| error::db_put(err, "vote"))?;
        info!(user = %user.id, %ballot, ?change, "Vote recorded");
        Ok(Outcome::Recorded)
    }).await?;

    match outcome {
        Outcome::Recorded => redirect(&format!("/polls/{question_id}/results")),
        Outcome::Redisplay(page) => Ok(reply::json(&page).into_response()),
    }
}

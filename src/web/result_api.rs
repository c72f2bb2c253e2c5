use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use warp::reply::{self, Reply, Response};
use warp::Rejection;

use super::blocking;
use super::question_api::{published_question, question_choices};
use crate::store::PollStore;
use crate::voting::{Tally, WeakId};

/// GET /polls/:id/results
pub async fn results(id: i32, store: Arc<dyn PollStore>) -> Result<Response, Rejection> {
    let question_id = WeakId(id);
    let now = Utc::now();

    let tally = blocking(store, move |store| {
        let question = published_question(store, question_id, now)?;
        let choices = question_choices(store, &question)?;
        Ok(Tally::new(question, choices))
    }).await?;
    debug!(question = %question_id, total = tally.total_votes, "Tallied results");

    Ok(reply::json(&tally).into_response())
}

mod auth;
pub mod db;
mod question_api;
mod result_api;
mod vote_api;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task;
use tracing::{info, warn};
use warp::filters::body::BodyDeserializeError;
use warp::http::{StatusCode, Uri};
use warp::reject::{
    InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader, PayloadTooLarge,
    UnsupportedMediaType,
};
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use crate::config::Config;
use crate::error::{self, HttpError, ServerError};
use crate::store::PollStore;
use crate::voting::UnvalidatedBallot;

pub use auth::USER_HEADER;

/// Form bodies are a single field; anything larger is refused.
const FORM_LIMIT: u64 = 16 * 1024;

fn with_store(
    store: Arc<dyn PollStore>,
) -> impl Filter<Extract = (Arc<dyn PollStore>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

/// Runs blocking store work off the async executor.
pub(crate) async fn blocking<T, F>(store: Arc<dyn PollStore>, work: F) -> Result<T, Rejection>
where
    T: Send + 'static,
    F: FnOnce(&dyn PollStore) -> Result<T, HttpError> + Send + 'static,
{
    task::spawn_blocking(move || work(store.as_ref()))
        .await
        .map_err(|err| warp::reject::custom(error::task_failed(err)))?
        .map_err(warp::reject::custom)
}

pub(crate) fn redirect(location: &str) -> Result<Response, Rejection> {
    let uri: Uri = location.parse().map_err(|_| {
        warp::reject::custom(HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect target"))
    })?;
    Ok(warp::redirect::see_other(uri).into_response())
}

pub fn routes(
    store: Arc<dyn PollStore>,
    login_url: &str,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let login_url: Arc<str> = Arc::from(login_url);

    let root = warp::path::end()
        .and(warp::get())
        .and_then(|| async { redirect("/polls") });

    let index = warp::path!("polls")
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(question_api::index);

    let search = warp::path!("polls" / "search")
        .and(warp::get())
        .and(warp::query::<question_api::SearchQuery>())
        .and(with_store(store.clone()))
        .and_then(question_api::search);

    let detail = warp::path!("polls" / i32)
        .and(warp::get())
        .and(auth::principal(store.clone()))
        .and(with_store(store.clone()))
        .and_then(question_api::detail);

    let results = warp::path!("polls" / i32 / "results")
        .and(warp::get())
        .and(with_store(store.clone()))
        .and_then(result_api::results);

    let vote = warp::path!("polls" / i32 / "vote")
        .and(warp::post())
        .and(auth::principal(store.clone()))
        .and(warp::body::content_length_limit(FORM_LIMIT))
        .and(warp::body::form::<UnvalidatedBallot>())
        .and(with_store(store))
        .and(warp::any().map(move || login_url.clone()))
        .and_then(vote_api::vote);

    root.or(index)
        .or(search)
        .or(detail)
        .or(results)
        .or(vote)
        .with(warp::trace::request())
        .recover(handle_rejection)
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(err) = err.find::<HttpError>() {
        return Ok(err.to_response());
    }

    let failure = if err.is_not_found() {
        HttpError::new(StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<MethodNotAllowed>().is_some() {
        HttpError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        HttpError::new(StatusCode::BAD_REQUEST, format!("Malformed form body: {e}"))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        HttpError::new(StatusCode::BAD_REQUEST, format!("Malformed query: {e}"))
    } else if err.find::<UnsupportedMediaType>().is_some() {
        HttpError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type")
    } else if err.find::<PayloadTooLarge>().is_some() {
        HttpError::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
    } else if err.find::<LengthRequired>().is_some() {
        HttpError::new(StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else if let Some(e) = err.find::<MissingHeader>() {
        HttpError::new(StatusCode::BAD_REQUEST, format!("Missing header {}", e.name()))
    } else if let Some(e) = err.find::<InvalidHeader>() {
        HttpError::new(StatusCode::BAD_REQUEST, format!("Invalid header {}", e.name()))
    } else {
        warn!(rejection = ?err, "Unhandled rejection");
        HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(failure.to_response())
}

/// Serves until Ctrl-C.
pub async fn serve(store: Arc<dyn PollStore>, config: &Config) -> Result<(), ServerError> {
    let routes = routes(store, &config.login_url);
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(config.bind, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Failed to listen for shutdown signal");
            }
        })?;
    log_routes(addr);
    server.await;
    info!("Server stopped");
    Ok(())
}

fn log_routes(addr: SocketAddr) {
    info!("Server listening on {}", addr);
    info!("- Listing: http://{}/polls", addr);
    info!("- Search: http://{}/polls/search?q=", addr);
    info!("- Detail/results/vote: http://{}/polls/:id[/results|/vote]", addr);
}

use std::fmt::Display;
use std::ops::RangeInclusive;

use diesel::r2d2::PoolError;
use diesel::result::Error as DbError;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::config::ConfigError;
use crate::voting::WeakId;

#[derive(Debug, Error)]
#[error("Validation error: {message}")]
pub struct ValidationError {
    message: String,
}

pub fn question_text_invalid_size(limits: RangeInclusive<usize>, len: usize) -> ValidationError {
    ValidationError {
        message: format!("question text must be between {} and {} characters, got {len}", limits.start(), limits.end()),
    }
}

pub fn choice_text_invalid_size(index: usize, limits: RangeInclusive<usize>, len: usize) -> ValidationError {
    ValidationError {
        message: format!("choice {index} must be between {} and {} characters, got {len}", limits.start(), limits.end()),
    }
}

pub fn ballot_missing_choice(question_id: WeakId) -> ValidationError {
    ValidationError {
        message: format!("ballot for question {question_id} has no choice"),
    }
}

pub fn ballot_unreadable_choice(question_id: WeakId, raw: &str) -> ValidationError {
    ValidationError {
        message: format!("ballot for question {question_id} has unreadable choice {raw:?}"),
    }
}

pub fn ballot_invalid_selection(question_id: WeakId, choice_id: WeakId) -> ValidationError {
    ValidationError {
        message: format!("ballot for question {question_id} selects choice {choice_id} of another question"),
    }
}


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("No {subject} with id {id}")]
    Missing { subject: &'static str, id: String },

    #[error("Store state was poisoned by a panicking writer")]
    Poisoned,
}

pub fn missing(subject: &'static str, id: impl Display) -> StoreError {
    StoreError::Missing { subject, id: id.to_string() }
}


#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpError {
    pub code: StatusCode,
    message: String,
    #[source]
    source: Option<StoreError>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    message: &'a str,
}

impl HttpError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        HttpError { code, message: message.into(), source: None }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn to_response(&self) -> Response {
        let body = ErrorBody { status: self.code.as_u16(), message: &self.message };
        reply::with_status(reply::json(&body), self.code).into_response()
    }
}

impl warp::reject::Reject for HttpError {}

impl Reply for HttpError {
    fn into_response(self) -> Response {
        self.to_response()
    }
}

pub fn not_found(subject: &str, id: impl Display) -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, format!("No {subject} found with id {id}"))
}

pub fn db_get(source: StoreError, subject: &str, object: Option<&str>) -> HttpError {
    let message = match object {
        Some(object) => format!("Failed to retrieve {subject} of {object}"),
        None => format!("Failed to retrieve {subject}"),
    };
    with_source(source, message)
}

pub fn db_put(source: StoreError, subject: &str) -> HttpError {
    with_source(source, format!("Failed to record {subject}"))
}

fn with_source(source: StoreError, message: String) -> HttpError {
    let code = match source {
        StoreError::Missing { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code.is_server_error() {
        error!(error = %source, "{message}");
    }
    HttpError { code, message, source: Some(source) }
}

pub fn task_failed(err: JoinError) -> HttpError {
    error!(error = %err, "Store task did not complete");
    HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, "Request could not be completed")
}


#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create database pool: {0}")]
    Pool(#[from] PoolError),

    #[error("Failed to bind server: {0}")]
    Bind(#[from] warp::Error),
}

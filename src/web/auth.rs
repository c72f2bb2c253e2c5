//! Principal extraction.
//!
//! Login itself happens upstream; a trusted proxy forwards the signed-in
//! user's id in `x-user-id`. Anything that doesn't resolve to a known user
//! is treated as an anonymous request.
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;
use warp::{Filter, Rejection};

use super::{blocking, with_store};
use crate::error;
use crate::store::PollStore;
use crate::voting::{Id, User};

pub const USER_HEADER: &str = "x-user-id";

pub fn principal(
    store: Arc<dyn PollStore>,
) -> impl Filter<Extract = (Option<User>,), Error = Rejection> + Clone {
    warp::header::optional::<String>(USER_HEADER)
        .and(with_store(store))
        .and_then(resolve)
}

async fn resolve(header: Option<String>, store: Arc<dyn PollStore>) -> Result<Option<User>, Rejection> {
    let id = match header.as_deref().map(|raw| raw.trim().parse::<Uuid>()) {
        None => return Ok(None),
        Some(Ok(id)) => Id(id),
        Some(Err(err)) => {
            debug!(error = %err, "Ignoring malformed {USER_HEADER} header");
            return Ok(None);
        },
    };

    let user = blocking(store, move |store| {
        store.user(&id).map_err(|err| error::db_get(err, "user", None))
    }).await?;

    if user.is_none() {
        debug!(user = %id, "Unknown principal");
    }
    Ok(user)
}

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use kanban_domain::Caller;
use serde::Deserialize;

use crate::api::SharedState;
use crate::error::ApiError;

/// The caller as established by the authenticating proxy in front of the
/// server.
///
/// Read from the configured identity header. Browsers cannot set headers on
/// a WebSocket handshake, so a `user_id` query parameter is accepted when the
/// header is absent.
#[derive(Debug, Clone)]
pub struct Identity(pub Caller);

#[derive(Deserialize)]
struct IdentityQuery {
    user_id: Option<String>,
}

impl FromRequestParts<SharedState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(state.identity_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let identity = match from_header {
            Some(id) => Some(id),
            None => Query::<IdentityQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(query)| query.user_id),
        };
        Ok(Identity(Caller::from_identity(identity.as_deref())?))
    }
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::endpoints::common::ApiError;
use crate::state::ServiceState;

/// Header carrying the identifier of the authenticated owner.
pub const HEADER_OWNER_ID: &str = "x-owner-id";

/// Extractor for the owner making the request.
///
/// The owner is the opaque value of the `x-owner-id` header, which is set by the authenticating
/// gateway in front of the server. Requests without a non-empty owner are rejected with `401`.
#[derive(Debug, Clone)]
pub struct Owner(pub String);

impl Owner {
    /// Returns the owner identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<ServiceState> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let owner = parts
            .headers
            .get(HEADER_OWNER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ApiError::Unauthenticated)?
            .to_owned();

        sentry::configure_scope(|s| {
            s.set_user(Some(sentry::User {
                id: Some(owner.clone()),
                ..Default::default()
            }));
        });

        Ok(Owner(owner))
    }
}

//! Resolves the viewer from the header set by the trusted authentication proxy.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::application::{error::repo_error_to_http, viewer::Viewer};

use super::HttpState;

/// The viewer of the current request; anonymous when the header is absent,
/// blank, or names a user that does not exist.
pub struct CurrentViewer(pub Viewer);

impl FromRequestParts<HttpState> for CurrentViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(&state.auth.viewer_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let Some(username) = username else {
            return Ok(Self(Viewer::Anonymous));
        };

        let user = state
            .users
            .find_by_username(username)
            .await
            .map_err(|err| {
                repo_error_to_http("infra::http::viewer::CurrentViewer", err).into_response()
            })?;

        if user.is_none() {
            debug!(username, "viewer header names an unknown user");
        }
        Ok(Self(Viewer::from(user)))
    }
}

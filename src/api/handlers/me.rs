use super::login::error_response;
use crate::{
    api::types::{ErrorResponse, SessionData, SessionResponse},
    auth::Auth,
};
use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses (
        (status = 200, description = "Current user", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(auth, headers))]
pub async fn me(auth: Extension<Arc<Auth>>, headers: HeaderMap) -> Response {
    let Some(claims) = bearer_token(&headers).and_then(|token| auth.validate_token(token)) else {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    };

    match auth.store().find_by_id(claims.user_id).await {
        Ok(Some(user)) if user.active => (
            StatusCode::OK,
            Json(SessionResponse {
                success: true,
                data: SessionData {
                    user: user.profile(),
                    expires_at: claims.exp,
                },
            }),
        )
            .into_response(),
        Ok(Some(_)) => {
            debug!(user_id = claims.user_id, "token for inactive user");
            error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            error!("failed to load user: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

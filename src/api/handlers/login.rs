use crate::{
    api::types::{ErrorResponse, LoginResponse, INVALID_CREDENTIALS_MESSAGE},
    auth::Auth,
    validator::{validate_login, LoginRequest},
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Invalid email, missing password or missing payload", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Credential store failure", body = ErrorResponse),
    ),
    tag = "auth"
)]
// axum handler for login
#[instrument(skip(auth, payload))]
pub async fn login(auth: Extension<Arc<Auth>>, payload: Option<Json<LoginRequest>>) -> Response {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let credentials = match validate_login(&request) {
        Ok(credentials) => credentials,
        Err(e) => {
            debug!("rejected login input: {e}");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match auth.login(&credentials.email, &credentials.password).await {
        Ok(Some(result)) => {
            debug!(user_id = result.usuario.id, "login successful");
            (StatusCode::OK, Json(LoginResponse::from(result))).into_response()
        }
        Ok(None) => error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_MESSAGE),
        Err(e) => {
            error!("login failed: {e:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

pub(super) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

//! Response envelopes for the login API.
//!
//! Every body carries `success` and, except for `/api/auth/me`, a `message`.

use crate::{auth::LoginResult, store::UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const LOGIN_OK_MESSAGE: &str = "Login successful";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginData {
    pub token: String,
    pub user: UserProfile,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub data: LoginData,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            success: true,
            message: LOGIN_OK_MESSAGE.to_string(),
            data: LoginData {
                token: result.token,
                user: result.usuario,
            },
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user: UserProfile,
    pub expires_at: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub success: bool,
    pub data: SessionData,
}

#![allow(clippy::needless_for_each)]

use super::{
    handlers::{health, login, me},
    types,
};
use crate::{auth::LoginResult, store::UserProfile, validator::LoginRequest};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, login::login, me::me),
    components(schemas(
        health::Health,
        LoginRequest,
        LoginResult,
        UserProfile,
        types::LoginData,
        types::LoginResponse,
        types::ErrorResponse,
        types::SessionData,
        types::SessionResponse,
    )),
    modifiers(&BearerScheme),
    tags(
        (name = "auth", description = "Email/password login and session tokens"),
        (name = "health", description = "Service and credential store status")
    )
)]
struct ApiDoc;

struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_login_routes() {
        let doc = openapi();
        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/auth/me"));
        assert!(doc.paths.paths.contains_key("/health"));
    }

    #[test]
    fn registers_bearer_scheme() {
        let doc = openapi();
        let schemes = doc
            .components
            .map(|components| components.security_schemes)
            .unwrap_or_default();
        assert!(schemes.contains_key("bearer"));
    }
}

//! Route handlers for the login API.

pub mod health;
pub mod login;
pub mod me;

pub use self::health::health;
pub use self::login::login;
pub use self::me::me;

/// `GET /`
pub async fn root() -> &'static str {
    "🔑"
}

use super::{CredentialStore, NewUser, StoreError, StoreFuture, UserRecord};
use crate::{password::hash_password, validator::normalize_email};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument};

const USER_COLUMNS: &str = "id, nome, email, tipo, senha, ativo, \
     EXTRACT(EPOCH FROM ultimo_acesso)::BIGINT AS ultimo_acesso";

/// `usuarios` table over a Postgres pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool with at most `max_connections` connections.
    ///
    /// # Errors
    /// Returns an error if the first connection cannot be established.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .acquire_timeout(Duration::from_secs(5))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a user, hashing the password.
    ///
    /// # Errors
    /// Returns an error if hashing fails or the insert is rejected (e.g. duplicate email).
    pub async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        let hash = hash_password(&user.password)
            .map_err(|e| StoreError::Hash(e.to_string()))?;
        let query = format!(
            "INSERT INTO usuarios (nome, email, tipo, senha) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(&user.name)
            .bind(normalize_email(&user.email))
            .bind(&user.role)
            .bind(hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;
        Ok(record_from_row(&row)?)
    }

    async fn fetch_user(
        &self,
        filter: &'static str,
        bind: UserKey<'_>,
    ) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE {filter}");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let statement = sqlx::query(&query);
        let statement = match bind {
            UserKey::Email(email) => statement.bind(email),
            UserKey::Id(id) => statement.bind(id),
        };
        let row = statement
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(record_from_row).transpose()?)
    }
}

enum UserKey<'a> {
    Email(&'a str),
    Id(i64),
}

fn record_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        name: row.try_get("nome")?,
        email: row.try_get("email")?,
        role: row.try_get("tipo")?,
        password_hash: row.try_get("senha")?,
        active: row.try_get("ativo")?,
        last_login_at: row.try_get("ultimo_acesso")?,
    })
}

impl CredentialStore for PgStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let acquire_span = info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            );
            let mut conn = self.pool.acquire().instrument(acquire_span).await?;
            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            conn.ping().instrument(ping_span).await?;
            Ok(())
        })
    }

    fn count_users(&self) -> StoreFuture<'_, i64> {
        Box::pin(async move {
            let query = "SELECT COUNT(*) FROM usuarios";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            let count: i64 = sqlx::query_scalar(query)
                .fetch_one(&self.pool)
                .instrument(span)
                .await?;
            Ok(count)
        })
    }

    fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<UserRecord>> {
        Box::pin(async move {
            let email = normalize_email(email);
            self.fetch_user("lower(email) = $1", UserKey::Email(&email))
                .await
        })
    }

    fn find_by_id(&self, id: i64) -> StoreFuture<'_, Option<UserRecord>> {
        Box::pin(self.fetch_user("id = $1", UserKey::Id(id)))
    }

    fn record_login(&self, id: i64) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let query = "UPDATE usuarios SET ultimo_acesso = NOW() WHERE id = $1";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "UPDATE",
                db.statement = query
            );
            sqlx::query(query)
                .bind(id)
                .execute(&self.pool)
                .instrument(span)
                .await?;
            Ok(())
        })
    }
}

//! Relational storage of URL mappings and users.
//!
//! [`Store`] is the capability the service works against; [`PgStore`] is its
//! Postgres realization over a shared `sqlx::PgPool`. Uniqueness of
//! `short_code`, `email`, and `api_key` is enforced by the store's unique
//! indexes, not only by upstream logic, so out-of-band writes cannot corrupt
//! the space.

mod postgres;

pub use postgres::PgStore;

/// A stored user row. `api_key` is generated by the store on insert and
/// treated as immutable thereafter.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub api_key: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No live row matches the lookup.
    #[error("not found")]
    NotFound,
    /// A unique constraint rejected the write.
    #[error("{entity} already exists")]
    Conflict { entity: &'static str },
    /// The caller supplied a value the store cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Schema or driver failure.
    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}

impl Error {
    /// Whether the caller may expect a retry to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Storage(
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            )
        )
    }
}

/// Classifies a unique-constraint violation, leaving other errors untouched.
fn on_unique_violation(err: sqlx::Error, entity: &'static str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return Error::Conflict { entity };
        }
    }
    Error::Storage(err)
}

/// Synchronous-looking persistence operations the service orchestrates.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Inserts a `(short_code, long_url)` mapping. Fails with
    /// [`Error::Conflict`] if the short code is already mapped.
    async fn insert_mapping(&self, short_code: &str, long_url: &str) -> Result<(), Error>;

    /// Returns the long URL mapped by `short_code`.
    async fn lookup_long(&self, short_code: &str) -> Result<String, Error>;

    /// Inserts a user, returning the stored row including the generated
    /// `api_key`. Fails with [`Error::Conflict`] on a duplicate email.
    async fn insert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, Error>;

    async fn lookup_user_by_email(&self, email: &str) -> Result<User, Error>;

    /// Whether `api_key` belongs to a live user. A key that does not parse
    /// as a 128-bit value is [`Error::InvalidArgument`], not `false`.
    async fn api_key_valid(&self, api_key: &str) -> Result<bool, Error>;
}

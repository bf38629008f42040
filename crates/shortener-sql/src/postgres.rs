use super::{on_unique_violation, Error, Store, User};

/// Schema statements applied by [`PgStore::migrate`]. Each is idempotent so
/// every instance can run them at bootstrap.
const SCHEMA: &[&str] = &[
    // uuid_generate_v4() backs the api_key column default.
    r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#,
    r#"
    CREATE TABLE IF NOT EXISTS url_mappings (
        id         BIGSERIAL PRIMARY KEY,
        short_code TEXT NOT NULL UNIQUE,
        long_url   TEXT NOT NULL CHECK (octet_length(long_url) <= 2048),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id         BIGSERIAL PRIMARY KEY,
        email      TEXT NOT NULL UNIQUE CHECK (email <> ''),
        first_name TEXT NOT NULL,
        last_name  TEXT NOT NULL CHECK (last_name <> ''),
        api_key    UUID NOT NULL UNIQUE DEFAULT uuid_generate_v4(),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at TIMESTAMPTZ
    )
    "#,
];

/// [`Store`] over a shared Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Applies the schema. Idempotent; run at every bootstrap.
    pub async fn migrate(&self) -> Result<(), Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("schema migration complete");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn insert_mapping(&self, short_code: &str, long_url: &str) -> Result<(), Error> {
        sqlx::query("INSERT INTO url_mappings (short_code, long_url) VALUES ($1, $2)")
            .bind(short_code)
            .bind(long_url)
            .execute(&self.pool)
            .await
            .map_err(|err| on_unique_violation(err, "short code"))?;
        Ok(())
    }

    async fn lookup_long(&self, short_code: &str) -> Result<String, Error> {
        let long_url: Option<String> = sqlx::query_scalar(
            "SELECT long_url FROM url_mappings WHERE short_code = $1 AND deleted_at IS NULL",
        )
        .bind(short_code)
        .fetch_optional(&self.pool)
        .await?;

        long_url.ok_or(Error::NotFound)
    }

    async fn insert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, Error> {
        if email.is_empty() {
            return Err(Error::InvalidArgument("email is required".to_string()));
        }
        if last_name.is_empty() {
            return Err(Error::InvalidArgument("last name is required".to_string()));
        }

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email)
            VALUES ($1, $2, $3)
            RETURNING id, email, first_name, last_name, api_key, created_at, updated_at
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| on_unique_violation(err, "email"))
    }

    async fn lookup_user_by_email(&self, email: &str) -> Result<User, Error> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, email, first_name, last_name, api_key, created_at, updated_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(Error::NotFound)
    }

    async fn api_key_valid(&self, api_key: &str) -> Result<bool, Error> {
        let key: uuid::Uuid = api_key
            .parse()
            .map_err(|_| Error::InvalidArgument("malformed api key".to_string()))?;

        let valid: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE api_key = $1 AND deleted_at IS NULL)",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(valid)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::data::map_db_error;
use crate::domain::error::DomainError;
use crate::domain::user::{User, UserChanges};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user. A taken email is reported as `DuplicateEmail`
    /// by the store itself, not only by a prior lookup.
    async fn create(&self, user: User) -> Result<User, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DomainError>;
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    salt: String,
    role: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(DomainError::Internal)?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            salt: row.salt,
            role,
            image: row.image,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_email_conflict(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation() && db.constraint().is_none_or(|c| c.contains("email")))
        .unwrap_or(false)
}

/// The `UNIQUE (email)` constraint is the authoritative duplicate signal.
fn map_write_error(op: &str, email: &str, e: sqlx::Error) -> DomainError {
    if is_email_conflict(&e) {
        DomainError::DuplicateEmail(email.to_string())
    } else {
        map_db_error(op, e)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password, salt, role, image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(user.role.as_str())
        .bind(&user.image)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("users.create", &user.email, e))?;

        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password, salt, role, image, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("users.find_by_email", e))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password, salt, role, image, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("users.find_by_id", e))?;

        row.map(User::try_from).transpose()
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DomainError> {
        let email = changes.email.clone();
        let (hash, salt) = match changes.credentials {
            Some((hash, salt)) => (Some(hash), Some(salt)),
            None => (None, None),
        };

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET
                name = COALESCE($1, name),
                email = COALESCE($2, email),
                image = COALESCE($3, image),
                password = COALESCE($4, password),
                salt = COALESCE($5, salt)
            WHERE id = $6
            RETURNING id, name, email, password, salt, role, image, created_at
            "#,
        )
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.image)
        .bind(hash)
        .bind(salt)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            let err = map_write_error("users.update", email.as_deref().unwrap_or_default(), e);
            if matches!(err, DomainError::DuplicateEmail(_)) {
                warn!(user_id = %id, "email change collides with another account");
            }
            err
        })?;

        if row.is_some() {
            info!(user_id = %id, "user updated");
        }

        row.map(User::try_from).transpose()
    }
}

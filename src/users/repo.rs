use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::users::repo_types::{NewUserRecord, User, UserChanges};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{field} already exists")]
    Conflict { field: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage for user rows. Every lookup ignores soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// One page ordered newest first, plus the total number of matching rows.
    async fn paginate(
        &self,
        limit: i64,
        offset: i64,
        search: Option<&str>,
    ) -> RepoResult<(Vec<User>, i64)>;
    async fn insert(&self, record: NewUserRecord) -> RepoResult<User>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>>;
    async fn soft_delete(&self, id: Uuid) -> RepoResult<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// `%term%` with LIKE metacharacters escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn map_write_error(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("users_email_key") => "email",
                _ => "username",
            };
            return RepoError::Conflict {
                field: field.to_string(),
            };
        }
    }
    RepoError::Database(err)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, is_superuser,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, is_superuser,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn paginate(
        &self,
        limit: i64,
        offset: i64,
        search: Option<&str>,
    ) -> RepoResult<(Vec<User>, i64)> {
        let pattern = search.map(like_pattern);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1)
            "#,
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_active, is_superuser,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok((rows, total))
    }

    async fn insert(&self, record: NewUserRecord) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_active, is_superuser,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, username, email, password_hash, is_active, is_superuser,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(record.id)
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.is_active)
        .bind(record.is_superuser)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_error)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = $2,
                   email = $3,
                   password_hash = COALESCE($4, password_hash),
                   is_active = $5,
                   is_superuser = $6,
                   updated_at = $7
             WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, username, email, password_hash, is_active, is_superuser,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(changes.password_hash.as_deref())
        .bind(changes.is_active)
        .bind(changes.is_superuser)
        .bind(changes.updated_at)
        .fetch_optional(&self.db)
        .await
        .map_err(map_write_error)
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET deleted_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, username, email, password_hash, is_active, is_superuser,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

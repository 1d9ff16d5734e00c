use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    repo::{RepoError, RepoResult, UserRepository},
    repo_types::{NewUserRecord, User, UserChanges},
};

/// In-process store with the same visibility and uniqueness rules as the postgres schema.
#[derive(Default)]
pub struct MemoryUserRepository {
    rows: RwLock<Vec<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, soft-deleted ones included.
    pub async fn all_rows(&self) -> Vec<User> {
        self.rows.read().await.clone()
    }
}

fn conflict(rows: &[User], skip: Option<Uuid>, username: &str, email: &str) -> Option<RepoError> {
    let live = rows
        .iter()
        .filter(|u| u.deleted_at.is_none() && Some(u.id) != skip);
    for u in live {
        if u.username == username {
            return Some(RepoError::Conflict { field: "username".into() });
        }
        if u.email.to_lowercase() == email.to_lowercase() {
            return Some(RepoError::Conflict { field: "email".into() });
        }
    }
    None
}

fn contains_term(user: &User, needle: &str) -> bool {
    user.username.to_lowercase().contains(needle) || user.email.to_lowercase().contains(needle)
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|u| u.username == username && u.deleted_at.is_none())
            .cloned())
    }

    async fn paginate(
        &self,
        limit: i64,
        offset: i64,
        search: Option<&str>,
    ) -> RepoResult<(Vec<User>, i64)> {
        let needle = search.map(str::to_lowercase);
        let rows = self.rows.read().await;
        let mut hits: Vec<User> = rows
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .filter(|u| needle.as_deref().map_or(true, |n| contains_term(u, n)))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = hits.len() as i64;
        let page = hits
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert(&self, record: NewUserRecord) -> RepoResult<User> {
        let mut rows = self.rows.write().await;
        if let Some(err) = conflict(&rows, None, &record.username, &record.email) {
            return Err(err);
        }
        let user = User {
            id: record.id,
            username: record.username,
            email: record.email,
            password_hash: record.password_hash,
            is_active: record.is_active,
            is_superuser: record.is_superuser,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: None,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut rows = self.rows.write().await;
        if !rows.iter().any(|u| u.id == id && u.deleted_at.is_none()) {
            return Ok(None);
        }
        if let Some(err) = conflict(&rows, Some(id), &changes.username, &changes.email) {
            return Err(err);
        }
        let Some(user) = rows.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.username = changes.username;
        user.email = changes.email;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.is_active = changes.is_active;
        user.is_superuser = changes.is_superuser;
        user.updated_at = Some(changes.updated_at);
        Ok(Some(user.clone()))
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<Option<User>> {
        let mut rows = self.rows.write().await;
        let Some(user) = rows
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        else {
            return Ok(None);
        };
        user.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(Some(user.clone()))
    }
}

use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::password::hash_password,
    errors::{AppError, AppResult},
    users::{
        repo::UserRepository,
        repo_types::{NewUserRecord, User, UserChanges},
    },
};

/// Validated input for a new user; the password is still plain text.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

/// Validated input for an update; `password: None` keeps the current one.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub page_count: i64,
}

/// `ceil(total / page_size)`; zero rows means zero pages.
pub fn page_count(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 0;
    }
    total / page_size + i64::from(total % page_size != 0)
}

/// `page` and `page_size` are 1-based and already checked to be positive.
pub async fn paginate_users(
    users: &dyn UserRepository,
    page: i64,
    page_size: i64,
    search: Option<&str>,
) -> AppResult<PageOf<User>> {
    let offset = (page - 1).saturating_mul(page_size);
    let (items, total) = users.paginate(page_size, offset, search).await?;
    debug!(page, page_size, total, rows = items.len(), "users page loaded");
    Ok(PageOf {
        items,
        total,
        page,
        page_size,
        page_count: page_count(total, page_size),
    })
}

pub async fn get_user(users: &dyn UserRepository, id: Uuid) -> AppResult<User> {
    users
        .find_by_id(id)
        .await?
        .ok_or_else(AppError::user_not_found)
}

pub async fn create_user(
    users: &dyn UserRepository,
    input: NewUser,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
) -> AppResult<User> {
    let password_hash = hash_password(&input.password)?;
    let user = users
        .insert(NewUserRecord {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            password_hash,
            is_active: input.is_active,
            is_superuser: input.is_superuser,
            created_at,
            updated_at,
        })
        .await?;
    info!(user_id = %user.id, username = %user.username, "user created");
    Ok(user)
}

pub async fn update_user(
    users: &dyn UserRepository,
    existing: &User,
    input: UserUpdate,
) -> AppResult<User> {
    let password_hash = input.password.as_deref().map(hash_password).transpose()?;
    let user = users
        .update(
            existing.id,
            UserChanges {
                username: input.username,
                email: input.email,
                password_hash,
                is_active: input.is_active,
                is_superuser: input.is_superuser,
                updated_at: OffsetDateTime::now_utc(),
            },
        )
        .await?
        .ok_or_else(AppError::user_not_found)?;
    info!(user_id = %user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(users: &dyn UserRepository, existing: &User) -> AppResult<User> {
    let user = users
        .soft_delete(existing.id)
        .await?
        .ok_or_else(AppError::user_not_found)?;
    info!(user_id = %user.id, "user soft-deleted");
    Ok(user)
}

/// Seeds an active superuser, used by the `create-superuser` command.
pub async fn create_superuser(
    users: &dyn UserRepository,
    email: &str,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let now = OffsetDateTime::now_utc();
    create_user(
        users,
        NewUser {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            is_active: true,
            is_superuser: true,
        },
        now,
        Some(now),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::verify_password, users::memory::MemoryUserRepository};

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password: "testpassword".into(),
            is_active: true,
            is_superuser: false,
        }
    }

    #[test]
    fn page_count_is_ceiling() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(3, 2), 2);
        assert_eq!(page_count(4, 2), 2);
        assert_eq!(page_count(5, 2), 3);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(2, i64::MAX), 1);
        assert_eq!(page_count(i64::MAX, 2), i64::MAX / 2 + 1);
    }

    #[tokio::test]
    async fn last_page_holds_the_remainder() {
        let repo = MemoryUserRepository::new();
        let base = OffsetDateTime::now_utc();
        for i in 0..7 {
            create_user(
                &repo,
                new_user(&format!("u{i}"), &format!("u{i}@test.com")),
                base + time::Duration::seconds(i),
                None,
            )
            .await
            .unwrap();
        }

        let first = paginate_users(&repo, 1, 3, None).await.unwrap();
        assert_eq!(first.total, 7);
        assert_eq!(first.page_count, 3);
        assert_eq!(
            first.items.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
            vec!["u6", "u5", "u4"]
        );

        let last = paginate_users(&repo, 3, 3, None).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].username, "u0");

        let beyond = paginate_users(&repo, 4, 3, None).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 7);
    }

    #[tokio::test]
    async fn create_hashes_the_password() {
        let repo = MemoryUserRepository::new();
        let user = create_user(&repo, new_user("test", "test@example.com"), OffsetDateTime::now_utc(), None)
            .await
            .unwrap();
        assert_ne!(user.password_hash, "testpassword");
        assert!(verify_password("testpassword", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_a_conflict() {
        let repo = MemoryUserRepository::new();
        let now = OffsetDateTime::now_utc();
        create_user(&repo, new_user("test", "test@example.com"), now, None)
            .await
            .unwrap();

        let err = create_user(&repo, new_user("test", "other@example.com"), now, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field } if field == "username"));

        let err = create_user(&repo, new_user("other", "test@example.com"), now, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field } if field == "email"));

        assert_eq!(repo.all_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn update_rehashes_only_when_password_given() {
        let repo = MemoryUserRepository::new();
        let user = create_user(&repo, new_user("test", "test@example.com"), OffsetDateTime::now_utc(), None)
            .await
            .unwrap();
        let original_hash = user.password_hash.clone();

        let kept = update_user(
            &repo,
            &user,
            UserUpdate {
                username: "renamed".into(),
                email: "renamed@example.com".into(),
                password: None,
                is_active: false,
                is_superuser: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(kept.password_hash, original_hash);
        assert_eq!(kept.username, "renamed");
        assert!(!kept.is_active);
        assert!(kept.is_superuser);
        assert!(kept.updated_at.is_some());

        let changed = update_user(
            &repo,
            &kept,
            UserUpdate {
                username: "renamed".into(),
                email: "renamed@example.com".into(),
                password: Some("newpassword".into()),
                is_active: true,
                is_superuser: true,
            },
        )
        .await
        .unwrap();
        assert_ne!(changed.password_hash, original_hash);
        assert!(verify_password("newpassword", &changed.password_hash).unwrap());
    }

    #[tokio::test]
    async fn deleted_user_disappears_from_every_lookup() {
        let repo = MemoryUserRepository::new();
        let user = create_user(&repo, new_user("test", "test@example.com"), OffsetDateTime::now_utc(), None)
            .await
            .unwrap();

        let deleted = delete_user(&repo, &user).await.unwrap();
        assert!(deleted.deleted_at.is_some());

        assert!(matches!(get_user(&repo, user.id).await, Err(AppError::NotFound(_))));
        assert!(repo.find_by_username("test").await.unwrap().is_none());
        assert_eq!(paginate_users(&repo, 1, 10, None).await.unwrap().total, 0);
        assert!(matches!(delete_user(&repo, &user).await, Err(AppError::NotFound(_))));

        // the row itself stays
        assert_eq!(repo.all_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn superuser_seed_is_active_and_verifiable() {
        let repo = MemoryUserRepository::new();
        let user = create_superuser(&repo, "test@local.com", "test", "password")
            .await
            .unwrap();
        assert!(user.is_active);
        assert!(user.is_superuser);
        assert!(verify_password("password", &user.password_hash).unwrap());
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::services::is_valid_email,
    users::{
        repo_types::User,
        services::{NewUser, PageOf, UserUpdate},
    },
    validation::FieldErrors,
};

const MIN_PASSWORD_LEN: usize = 8;
const DEFAULT_PAGE: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDetailResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl From<User> for UserDetailResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            is_active: u.is_active,
            is_superuser: u.is_superuser,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPaginateResponse {
    pub counts: i64,
    pub page_count: i64,
    pub page_size: i64,
    pub page: i64,
    pub results: Vec<UserDetailResponse>,
}

impl From<PageOf<User>> for UserPaginateResponse {
    fn from(p: PageOf<User>) -> Self {
        Self {
            counts: p.total,
            page_count: p.page_count,
            page_size: p.page_size,
            page: p.page,
            results: p.items.into_iter().map(UserDetailResponse::from).collect(),
        }
    }
}

/// Raw query string; numbers are parsed during validation so bad input is a 422.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ListUsersParams {
    pub page: i64,
    pub page_size: i64,
    pub search: Option<String>,
}

fn positive(errors: &mut FieldErrors, field: &str, raw: Option<&str>, default: i64) -> i64 {
    let raw = match raw.map(str::trim) {
        None | Some("") => return default,
        Some(v) => v,
    };
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => {
            errors.push(
                field,
                format!("invalid {field}, {field} should positive integer"),
            );
            default
        }
    }
}

impl ListUsersQuery {
    pub fn validate(self) -> Result<ListUsersParams, FieldErrors> {
        let mut errors = FieldErrors::new();
        let page = positive(&mut errors, "page", self.page.as_deref(), DEFAULT_PAGE);
        let page_size = positive(
            &mut errors,
            "page_size",
            self.page_size.as_deref(),
            DEFAULT_PAGE_SIZE,
        );
        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        errors.finish(|| ListUsersParams {
            page,
            page_size,
            search,
        })
    }
}

/// Request body for user creation; every field is required.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserCreateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

fn check_email(errors: &mut FieldErrors, email: Option<String>) -> Option<String> {
    let email = errors.required_str("email", email)?;
    if !is_valid_email(&email) {
        errors.push("email", "email is not a valid email address");
        return None;
    }
    Some(email)
}

fn check_password(errors: &mut FieldErrors, password: &str) -> bool {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(
            "password",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        );
        return false;
    }
    true
}

impl UserCreateRequest {
    pub fn validate(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = errors.required_str("username", self.username);
        let email = check_email(&mut errors, self.email);
        let password = errors
            .required_raw("password", self.password)
            .filter(|p| check_password(&mut errors, p));
        let is_active = errors.required("is_active", self.is_active);
        let is_superuser = errors.required("is_superuser", self.is_superuser);

        match (username, email, password, is_active, is_superuser) {
            (Some(username), Some(email), Some(password), Some(is_active), Some(is_superuser))
                if errors.is_empty() =>
            {
                Ok(NewUser {
                    username,
                    email,
                    password,
                    is_active,
                    is_superuser,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Request body for user update; `password` may be omitted or null.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl UserUpdateRequest {
    pub fn validate(self) -> Result<UserUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = errors.required_str("username", self.username);
        let email = check_email(&mut errors, self.email);
        let password = self.password.filter(|p| check_password(&mut errors, p));
        let is_active = errors.required("is_active", self.is_active);
        let is_superuser = errors.required("is_superuser", self.is_superuser);

        match (username, email, is_active, is_superuser) {
            (Some(username), Some(email), Some(is_active), Some(is_superuser))
                if errors.is_empty() =>
            {
                Ok(UserUpdate {
                    username,
                    email,
                    password,
                    is_active,
                    is_superuser,
                })
            }
            _ => Err(errors),
        }
    }
}

use serde::{Deserialize, Serialize};

/// `application/x-www-form-urlencoded` login body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub email: String,
    pub username: String,
}

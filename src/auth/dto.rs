use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::UserRecord;

/// Request body for user registration. Missing fields decode as empty and are
/// rejected by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login; one of `username` or `email` is required.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
}

impl From<&UserRecord> for PublicUser {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}

/// Outcome of a successful registration or login.
#[derive(Debug)]
pub struct Authenticated {
    pub user: PublicUser,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub access_token: String,
}

impl From<Authenticated> for RegisterResponse {
    fn from(a: Authenticated) -> Self {
        Self {
            id: a.user.id,
            name: a.user.name,
            username: a.user.username,
            email: a.user.email,
            access_token: a.access_token,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

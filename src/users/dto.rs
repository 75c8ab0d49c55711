use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_address: String,
    pub password: String,
}

/// Request body for profile updates. All three fields are required;
/// callers resend unchanged values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Request body for account deletion. The id, when present, must match the
/// authenticated user.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub user_id: Option<Uuid>,
}

/// Plain acknowledgment.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: &'static str,
    pub message: &'static str,
}

impl Ack {
    pub fn new(message: &'static str) -> Self {
        Self {
            status: "success",
            message,
        }
    }
}

/// Response returned after login. The token also travels in the
/// `auth-token` response header.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub status: &'static str,
    pub token: String,
    pub user_id: Uuid,
    pub logged_in: bool,
}

/// Update result metadata.
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub modified: u64,
}

/// Public part of the user returned to clients. Credential material never
/// appears here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email_address: user.email_address,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::advice::Advice;
use crate::domain::user::PublicUser;

// ======================= AUTH =======================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub admin_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub token_type: &'static str, // "Bearer"
    pub expires_in: i64,
}

// ======================= USERS =======================

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
}

// ======================= ADVICES =======================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdviceRequest {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListAdvicesQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListAdvicesResponse {
    pub advices: Vec<Advice>,
    pub total: usize,
}

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod error;
mod http_client;
pub mod session;

pub use error::AdviceClientError;
pub use http_client::AdviceClientHttp;
pub use session::{
    FileSlot, MemorySlot, Session, SessionChange, SessionHub, SessionSlot, SessionView, ViewId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// A user as the server returns it; secrets never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for PublicUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> [{}] id={}", self.name, self.email, self.role, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Psychology,
    Study,
    Life,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Psychology, Category::Study, Category::Life];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Psychology => "psychology",
            Category::Study => "study",
            Category::Life => "life",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown category '{s}', expected psychology, study or life"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub id: Uuid,
    pub category: Category,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({})\n    Q: {}\n    A: {}",
            self.category,
            self.id,
            self.created_at.format("%Y-%m-%d %H:%M"),
            self.question,
            self.answer
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdvice {
    pub category: Category,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.image.is_none() && self.password.is_none()
    }
}

/// Operations the advice server exposes. Calls that need a signed-in user
/// fail with [`AdviceClientError::NotSignedIn`] when no token is set.
#[async_trait]
pub trait AdviceApi {
    async fn register(&self, registration: Registration) -> Result<PublicUser, AdviceClientError>;
    async fn login(&self, email: &str, password: &str) -> Result<Session, AdviceClientError>;
    async fn me(&self) -> Result<PublicUser, AdviceClientError>;
    async fn update_profile(&self, update: ProfileUpdate) -> Result<PublicUser, AdviceClientError>;
    async fn list_advices(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Advice>, AdviceClientError>;
    async fn create_advice(&self, advice: NewAdvice) -> Result<Advice, AdviceClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_lenient_about_case() {
        assert_eq!("Study".parse::<Category>(), Ok(Category::Study));
        assert_eq!(" life ".parse::<Category>(), Ok(Category::Life));
        assert!("cooking".parse::<Category>().is_err());
    }

    #[test]
    fn advice_reads_camel_case_payload() {
        let raw = r#"{
            "id": "7f0b6a39-1d0c-4a9b-9c55-0f0e5a1c2b3d",
            "category": "psychology",
            "question": "Why?",
            "answer": "Because.",
            "createdAt": "2025-01-01T10:00:00Z"
        }"#;
        let advice: Advice = serde_json::from_str(raw).unwrap();
        assert_eq!(advice.category, Category::Psychology);
        assert_eq!(advice.author_id, None);
    }

    #[test]
    fn profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            name: Some("Ann".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Ann"}));
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }
}

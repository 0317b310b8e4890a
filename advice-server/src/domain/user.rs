use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Stored user record. Carries the password digest and salt, so it never
/// leaves the repository layer; callers get a [`PublicUser`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub salt: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        salt: String,
        role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            salt,
            role,
            image: None,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("image", &self.image)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            image: user.image,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields a profile update may touch. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub credentials: Option<(String, String)>,
}

impl UserChanges {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(image) = self.image {
            user.image = Some(image);
        }
        if let Some((hash, salt)) = self.credentials {
            user.password_hash = hash;
            user.salt = salt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User::new(
            "Ann".into(),
            "ann@x.com".into(),
            "deadbeef".into(),
            "cafe".into(),
            Role::User,
        )
    }

    #[test]
    fn public_projection_has_no_secrets() {
        let json = serde_json::to_value(PublicUser::from(sample())).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("salt"));
        assert_eq!(obj["role"], "user");
        assert!(obj.contains_key("createdAt"));
    }

    #[test]
    fn stored_record_keeps_secrets_under_original_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["password"], "deadbeef");
        assert_eq!(json["salt"], "cafe");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("deadbeef"));
        assert!(!rendered.contains("cafe"));
    }

    #[test]
    fn changes_merge_only_given_fields() {
        let mut user = sample();
        UserChanges {
            name: Some("Annie".into()),
            ..Default::default()
        }
        .apply(&mut user);
        assert_eq!(user.name, "Annie");
        assert_eq!(user.email, "ann@x.com");
        assert_eq!(user.password_hash, "deadbeef");
    }
}

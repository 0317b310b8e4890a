use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::user_directory::{NewUser, ProfileUpdate, UserDirectory};
use crate::domain::error::{DomainError, ValidationError};
use crate::domain::user::{PublicUser, Role};
use crate::infrastructure::security::{AdminKeyValidator, JwtKeys};

pub const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_CHARS,
        });
    }
    Ok(())
}

pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub admin_key: Option<String>,
}

pub struct SignedIn {
    pub user: PublicUser,
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AuthService {
    directory: UserDirectory,
    admin_keys: AdminKeyValidator,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(directory: UserDirectory, admin_keys: AdminKeyValidator, keys: JwtKeys) -> Self {
        Self {
            directory,
            admin_keys,
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn get_user(&self, id: Uuid) -> Result<PublicUser, DomainError> {
        self.directory
            .find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }

    /// Checks run in a fixed order: required fields, email shape, password
    /// length, email availability, then the admin key if one was given.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: Registration) -> Result<PublicUser, DomainError> {
        let name = input.name.map(|n| n.trim().to_string()).unwrap_or_default();
        let email = input.email.map(|e| e.trim().to_string()).unwrap_or_default();
        let password = input.password.unwrap_or_default();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail.into());
        }
        check_password(&password)?;

        if self.directory.find_by_email(&email).await?.is_some() {
            return Err(DomainError::DuplicateEmail(email));
        }

        let role = match input.admin_key.as_deref() {
            Some(key) if !key.is_empty() => {
                if !self.admin_keys.is_valid(key) {
                    warn!("registration rejected: invalid admin key");
                    return Err(DomainError::InvalidAdminKey);
                }
                Role::Admin
            }
            _ => Role::User,
        };

        let user = self
            .directory
            .create(NewUser {
                name,
                email,
                password,
                role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, DomainError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let user = self
            .directory
            .validate_credentials(email, password)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        let access_token = self
            .keys
            .generate_token(user.id)
            .map_err(|err| DomainError::Internal(err.to_string()))?;

        info!(user_id = %user.id, "user signed in");
        Ok(SignedIn {
            user,
            access_token,
            expires_in: self.keys.expires_in(),
        })
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        mut update: ProfileUpdate,
    ) -> Result<PublicUser, DomainError> {
        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
            if name.is_empty() {
                return Err(ValidationError::EmptyField("name").into());
            }
        }
        if let Some(email) = update.email.as_mut() {
            *email = email.trim().to_string();
            if !is_valid_email(email) {
                return Err(ValidationError::InvalidEmail.into());
            }
        }
        if let Some(password) = update.password.as_deref() {
            check_password(password)?;
        }

        self.directory
            .update(id, update)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }
}

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::data::bounded;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::{PublicUser, Role, User, UserChanges};
use crate::infrastructure::security::PasswordHasher;

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
}

/// Users as seen from outside the storage layer: everything returned is a
/// [`PublicUser`], so digests and salts never leave this module.
#[derive(Clone)]
pub struct UserDirectory {
    repo: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    timeout: Duration,
}

impl UserDirectory {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: PasswordHasher, timeout: Duration) -> Self {
        Self {
            repo,
            hasher,
            timeout,
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<PublicUser>, DomainError> {
        let user = bounded(self.timeout, "users.find_by_email", self.repo.find_by_email(email)).await?;
        Ok(user.map(PublicUser::from))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PublicUser>, DomainError> {
        let user = bounded(self.timeout, "users.find_by_id", self.repo.find_by_id(id)).await?;
        Ok(user.map(PublicUser::from))
    }

    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn create(&self, input: NewUser) -> Result<PublicUser, DomainError> {
        if self.find_by_email(&input.email).await?.is_some() {
            return Err(DomainError::DuplicateEmail(input.email));
        }

        let (hash, salt) = self
            .hasher
            .hash(&input.password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let user = User::new(input.name, input.email, hash, salt, input.role);

        // the store enforces uniqueness too, so a concurrent insert still
        // comes back as DuplicateEmail here
        let stored = bounded(self.timeout, "users.create", self.repo.create(user)).await?;
        Ok(stored.into())
    }

    /// `None` covers both an unknown email and a wrong password.
    #[instrument(skip(self, password))]
    pub async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<PublicUser>, DomainError> {
        let Some(user) =
            bounded(self.timeout, "users.find_by_email", self.repo.find_by_email(email)).await?
        else {
            debug!("credential check failed");
            return Ok(None);
        };

        if !self.hasher.verify(password, &user.password_hash, &user.salt) {
            debug!(user_id = %user.id, "credential check failed");
            return Ok(None);
        }

        Ok(Some(user.into()))
    }

    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<PublicUser>, DomainError> {
        let credentials = match update.password {
            Some(password) => Some(
                self.hasher
                    .hash(&password)
                    .map_err(|e| DomainError::Internal(e.to_string()))?,
            ),
            None => None,
        };
        let changes = UserChanges {
            name: update.name,
            email: update.email,
            image: update.image,
            credentials,
        };

        let user = bounded(self.timeout, "users.update", self.repo.update(id, changes)).await?;
        Ok(user.map(PublicUser::from))
    }
}

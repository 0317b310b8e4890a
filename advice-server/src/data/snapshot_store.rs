//! Whole-collection storage: every write loads the full snapshot, modifies
//! it and saves it back. Writers are serialized by one mutex, which also
//! makes the duplicate-email check and the insert a single step.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::data::advice_repository::AdviceRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::advice::{Advice, Category};
use crate::domain::error::DomainError;
use crate::domain::user::{User, UserChanges};

const USERS_FILE: &str = "users.json";
const ADVICES_FILE: &str = "advices.json";

#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    async fn load_users(&self) -> Result<Vec<User>, DomainError>;
    async fn save_users(&self, users: &[User]) -> Result<(), DomainError>;
    async fn load_advices(&self) -> Result<Vec<Advice>, DomainError>;
    async fn save_advices(&self, advices: &[Advice]) -> Result<(), DomainError>;
}

/// Process-local collections. Starts empty unless seeded explicitly.
#[derive(Default)]
pub struct MemoryBackend {
    users: Mutex<Vec<User>>,
    advices: Mutex<Vec<Advice>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(users: Vec<User>, advices: Vec<Advice>) -> Self {
        Self {
            users: Mutex::new(users),
            advices: Mutex::new(advices),
        }
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn load_users(&self) -> Result<Vec<User>, DomainError> {
        Ok(self.users.lock().await.clone())
    }

    async fn save_users(&self, users: &[User]) -> Result<(), DomainError> {
        *self.users.lock().await = users.to_vec();
        Ok(())
    }

    async fn load_advices(&self) -> Result<Vec<Advice>, DomainError> {
        Ok(self.advices.lock().await.clone())
    }

    async fn save_advices(&self, advices: &[Advice]) -> Result<(), DomainError> {
        *self.advices.lock().await = advices.to_vec();
        Ok(())
    }
}

/// Two pretty-printed JSON arrays, `users.json` and `advices.json`.
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Creates the directory and empty collections on first use.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        for name in [USERS_FILE, ADVICES_FILE] {
            let path = dir.join(name);
            if !tokio::fs::try_exists(&path)
                .await
                .map_err(|e| io_error(&path, e))?
            {
                tokio::fs::write(&path, b"[]")
                    .await
                    .map_err(|e| io_error(&path, e))?;
                info!(path = %path.display(), "initialised empty collection");
            }
        }

        Ok(Self { dir })
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, DomainError> {
        let path = self.dir.join(name);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DomainError::SchemaMissing(format!(
                    "collection file {} is missing",
                    path.display()
                )));
            }
            Err(e) => return Err(io_error(&path, e)),
        };
        serde_json::from_str(&raw).map_err(|e| {
            DomainError::BackendUnavailable(format!("{} is corrupt: {e}", path.display()))
        })
    }

    async fn write<T: Serialize + Sync>(&self, name: &str, items: &[T]) -> Result<(), DomainError> {
        let path = self.dir.join(name);
        let body = serde_json::to_string_pretty(items)
            .map_err(|e| DomainError::Internal(format!("serialize {name}: {e}")))?;

        // write-then-rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;
        debug!(path = %path.display(), count = items.len(), "collection saved");
        Ok(())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> DomainError {
    DomainError::BackendUnavailable(format!("{}: {e}", path.display()))
}

#[async_trait]
impl SnapshotBackend for JsonFileBackend {
    async fn load_users(&self) -> Result<Vec<User>, DomainError> {
        self.read(USERS_FILE).await
    }

    async fn save_users(&self, users: &[User]) -> Result<(), DomainError> {
        self.write(USERS_FILE, users).await
    }

    async fn load_advices(&self) -> Result<Vec<Advice>, DomainError> {
        self.read(ADVICES_FILE).await
    }

    async fn save_advices(&self, advices: &[Advice]) -> Result<(), DomainError> {
        self.write(ADVICES_FILE, advices).await
    }
}

pub struct SnapshotStore<B: SnapshotBackend> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: SnapshotBackend> SnapshotStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl<B: SnapshotBackend> UserRepository for SnapshotStore<B> {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.backend.load_users().await?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(DomainError::DuplicateEmail(user.email));
        }
        users.push(user.clone());
        self.backend.save_users(&users).await?;

        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let users = self.backend.load_users().await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let users = self.backend.load_users().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.backend.load_users().await?;
        let Some(idx) = users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(DomainError::DuplicateEmail(email.clone()));
            }
        }

        changes.apply(&mut users[idx]);
        let updated = users[idx].clone();
        self.backend.save_users(&users).await?;

        info!(user_id = %id, "user updated");
        Ok(Some(updated))
    }
}

#[async_trait]
impl<B: SnapshotBackend> AdviceRepository for SnapshotStore<B> {
    async fn create(&self, advice: Advice) -> Result<Advice, DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut advices = self.backend.load_advices().await?;
        advices.push(advice.clone());
        self.backend.save_advices(&advices).await?;

        info!(advice_id = %advice.id, category = %advice.category, "advice created");
        Ok(advice)
    }

    async fn list(&self, category: Option<Category>) -> Result<Vec<Advice>, DomainError> {
        let mut advices: Vec<Advice> = self
            .backend
            .load_advices()
            .await?
            .into_iter()
            .filter(|a| category.is_none_or(|c| a.category == c))
            .collect();
        // later insertions win timestamp ties
        advices.reverse();
        advices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(advices)
    }
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    File,
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageKind::Postgres),
            "file" | "json" => Ok(StorageKind::File),
            "memory" => Ok(StorageKind::Memory),
            other => Err(anyhow::anyhow!("invalid STORAGE_BACKEND: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub seed_demo_data: bool,
    pub jwt_secret: String,
    pub admin_key: Option<String>,
    pub store_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid PORT: {}", e))?;
        let storage: StorageKind = std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if storage == StorageKind::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }
        let data_dir = std::env::var("DATA_DIR")
            .unwrap_or_else(|_| "data".into())
            .into();
        let seed_demo_data = std::env::var("SEED_DEMO_DATA")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let admin_key = std::env::var("ADMIN_KEY").ok().filter(|k| !k.is_empty());
        let store_timeout = std::env::var("STORE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .map(Duration::from_secs)
            .map_err(|e| anyhow::anyhow!("invalid STORE_TIMEOUT_SECS: {}", e))?;
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            storage,
            database_url,
            data_dir,
            seed_demo_data,
            jwt_secret,
            admin_key,
            store_timeout,
            cors_origins,
        })
    }
}

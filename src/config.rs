// src/config.rs

use std::{env, str::FromStr};

use dotenvy::dotenv;

/// Score assumed for a task whose submission carries no score (or a zero score).
pub const DEFAULT_TASK_SCORE: f64 = 0.8;

/// How often the session reaper sweeps idle simulation sessions, in seconds.
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

/// Page size used when pulling full lists from PocketBase.
pub const POCKETBASE_PAGE_SIZE: u32 = 500;

/// Number of scenarios shown as "recent" on the dashboard.
pub const DASHBOARD_RECENT_SCENARIOS: usize = 3;

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    PocketBase,
    /// In-process mock, nothing survives a restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "pocketbase" | "pb" => Ok(StoreBackend::PocketBase),
            "memory" | "mock" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown STORE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub pocketbase_url: String,
    pub pocketbase_admin_email: Option<String>,
    pub pocketbase_admin_password: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub session_ttl: u64,
    pub rust_log: String,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "sqlite".to_string())
            .parse::<StoreBackend>()
            .unwrap_or_else(|e| panic!("{}", e));

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://simulex.db?mode=rwc".to_string());

        let pocketbase_url = env::var("POCKETBASE_URL")
            .unwrap_or_else(|_| "http://localhost:8091".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let session_ttl = env::var("SESSION_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(14_400);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            store_backend,
            database_url,
            pocketbase_url,
            pocketbase_admin_email: env::var("POCKETBASE_ADMIN_EMAIL").ok(),
            pocketbase_admin_password: env::var("POCKETBASE_ADMIN_PASSWORD").ok(),
            jwt_secret,
            jwt_expiration,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            cors_origins,
            session_ttl,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }

    /// Configuration for tests and embedding: in-memory store, no seeding.
    pub fn for_memory_store(jwt_secret: &str) -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: "sqlite::memory:".to_string(),
            pocketbase_url: "http://localhost:8091".to_string(),
            pocketbase_admin_email: None,
            pocketbase_admin_password: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            admin_email: None,
            admin_password: None,
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origins: Vec::new(),
            session_ttl: 14_400,
            rust_log: "error".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("sqlite".parse::<StoreBackend>(), Ok(StoreBackend::Sqlite));
        assert_eq!("PocketBase".parse::<StoreBackend>(), Ok(StoreBackend::PocketBase));
        assert_eq!(" mock ".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(
            split_list("http://a, ,http://b,"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }
}

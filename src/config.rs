use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use crate::attendance::hours::HoursRounding;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Which persistence medium backs identities and attendance records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store, optionally snapshotted to a JSON file.
    Local { path: Option<PathBuf> },
    Postgres { database_url: String },
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Local { .. } => "local",
            StoreBackend::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub jwt: JwtConfig,
    pub rounding: HoursRounding,
    pub default_location: String,
    pub seed_demo_account: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .to_lowercase()
            .as_str()
        {
            "local" => StoreBackend::Local {
                path: std::env::var("LOCAL_STORE_PATH").ok().map(PathBuf::from),
            },
            "postgres" => StoreBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL is required for the postgres backend")?,
            },
            other => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "timeregister".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "timeregister-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let rounding = match std::env::var("HOURS_ROUNDING") {
            Ok(v) => v.parse::<HoursRounding>()?,
            Err(_) => HoursRounding::default(),
        };

        Ok(Self {
            backend,
            jwt,
            rounding,
            default_location: std::env::var("DEFAULT_LOCATION")
                .unwrap_or_else(|_| "Default".into()),
            seed_demo_account: std::env::var("SEED_DEMO_ACCOUNT")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

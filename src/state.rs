use std::sync::Arc;

use anyhow::Context;
use time::Duration;
use tracing::{info, warn};

use crate::attendance::clock::{Clock, SystemClock};
use crate::attendance::controller::SessionController;
use crate::attendance::repo::PgAttendanceStore;
use crate::attendance::store::AttendanceStore;
use crate::auth::repo::{CredentialStore, PgCredentialStore};
use crate::config::{AppConfig, StoreBackend};
use crate::local::LocalStore;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn CredentialStore>,
    pub attendance: Arc<SessionController>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (users, records): (Arc<dyn CredentialStore>, Arc<dyn AttendanceStore>) =
            match &config.backend {
                StoreBackend::Local { path } => {
                    let store = Arc::new(match path {
                        Some(p) => LocalStore::open(p.clone()).await?,
                        None => {
                            warn!("LOCAL_STORE_PATH not set; data lives in memory only");
                            LocalStore::in_memory()
                        }
                    });
                    (
                        store.clone() as Arc<dyn CredentialStore>,
                        store as Arc<dyn AttendanceStore>,
                    )
                }
                StoreBackend::Postgres { database_url } => {
                    let db = sqlx::postgres::PgPoolOptions::new()
                        .max_connections(10)
                        .connect(database_url)
                        .await
                        .context("connect to database")?;

                    sqlx::migrate!("./migrations")
                        .run(&db)
                        .await
                        .context("run migrations")?;

                    (
                        Arc::new(PgCredentialStore::new(db.clone())) as Arc<dyn CredentialStore>,
                        Arc::new(PgAttendanceStore::new(db)) as Arc<dyn AttendanceStore>,
                    )
                }
            };
        info!(backend = config.backend.name(), rounding = ?config.rounding, "store ready");

        Ok(Self::from_parts(config, users, records, Arc::new(SystemClock)))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn CredentialStore>,
        records: Arc<dyn AttendanceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let attendance = Arc::new(SessionController::new(
            records,
            clock,
            config.rounding,
            config.default_location.clone(),
        ));
        let sessions = SessionRegistry::new(Duration::minutes(config.jwt.refresh_ttl_minutes));
        Self {
            config,
            users,
            attendance,
            sessions,
        }
    }

    /// In-memory state for tests; touches no external service.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::attendance::hours::HoursRounding;
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            backend: StoreBackend::Local { path: None },
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            rounding: HoursRounding::HalfHour,
            default_location: "Default".into(),
            seed_demo_account: false,
        });
        let store = Arc::new(LocalStore::in_memory());
        Self::from_parts(config, store.clone(), store, Arc::new(SystemClock))
    }
}

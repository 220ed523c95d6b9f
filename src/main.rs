mod app;
mod attendance;
mod auth;
mod config;
mod error;
mod local;
mod session;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "timeregister=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    if app_state.config.seed_demo_account {
        auth::services::seed_demo_account(app_state.users.as_ref()).await?;
        tracing::info!(email = auth::services::DEMO_EMAIL, "demo account ready");
    }

    app::serve(app::build_app(app_state)).await
}

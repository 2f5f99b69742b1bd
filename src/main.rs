use std::sync::Arc;

use agency_portal::config::PortalConfig;
use agency_portal::maintenance::postgres::PgResetBackend;
use agency_portal::platform::supabase::SupabaseClient;
use agency_portal::{db, routes, state, telemetry};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = PortalConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");
    let platform = SupabaseClient::new(&config.platform).expect("platform client init failed");

    let state = state::AppState::new(Arc::new(platform), Arc::new(PgResetBackend::new(pool)));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "agency portal listening");
    axum::serve(listener, app).await.expect("server failed");
}

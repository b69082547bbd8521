use std::sync::Arc;

use tollgate::{
    api::{build_router, start_api_server, ApiState},
    observability::init_observability,
    storage::InMemoryUserRepository,
    Config, Result, APP_NAME, VERSION,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (optional - won't fail if missing).
    // This must happen before any config is read from environment.
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = Config::from_env()?;
    init_observability(&config.observability).await?;

    info!(app_name = APP_NAME, version = VERSION, "Starting Tollgate authentication backend");
    info!(
        api_port = config.api.port,
        api_bind_address = %config.api.bind_address,
        role_source = ?config.auth.role_source,
        "Loaded configuration from environment"
    );

    let users: Arc<dyn tollgate::storage::UserRepository> = InMemoryUserRepository::shared();
    let state = ApiState::new(&config, users);

    // Seed a superadmin into an empty store so a fresh deployment has a way
    // in. Both variables must be present; otherwise the store starts empty.
    match (
        std::env::var("TOLLGATE_BOOTSTRAP_EMAIL"),
        std::env::var("TOLLGATE_BOOTSTRAP_PASSWORD"),
    ) {
        (Ok(email), Ok(password)) => {
            if state.auth_service.ensure_bootstrap_superadmin(&email, &password).await?.is_some()
            {
                info!(email = %email, "bootstrap superadmin created");
            }
        }
        _ => {
            warn!("No bootstrap superadmin configured; set TOLLGATE_BOOTSTRAP_EMAIL and TOLLGATE_BOOTSTRAP_PASSWORD to seed one");
        }
    }

    let router = build_router(&config, state);
    start_api_server(config.api.clone(), router).await
}

use events::Role;
use log::*;
use service::config::{Config, RustEnv};
use service::logging::Logger;
use service::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!(
        "starting helpdesk backend on {}:{}",
        config.interface, config.port
    );

    let app_state = AppState::new(config);

    if app_state.config.runtime_env == RustEnv::Development {
        seed_demo_accounts(&app_state);
    }

    if let Err(error) = web::init_server(app_state).await {
        error!("server failed to start: {error}");
        std::process::exit(1);
    }
}

/// Fixed credentials for local development only.
fn seed_demo_accounts(app_state: &AppState) {
    app_state.sessions.add_account(
        "u-admin",
        "admin@example.com",
        "Avery Admin",
        Role::Admin,
        "password",
    );
    app_state.sessions.add_account(
        "u-1",
        "user@example.com",
        "Uma User",
        Role::User,
        "password",
    );
    info!("seeded development accounts: admin@example.com, user@example.com");
}

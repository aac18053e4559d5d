use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use courier_core::task::spawn_logged;
use courier_core::tracing::init_tracing;
use courier_messaging::config::MessagingConfig;
use courier_messaging::hub::Hub;
use courier_messaging::infra::files::LocalFileStore;
use courier_messaging::infra::mail::SmtpMailer;
use courier_messaging::router::build_router;
use courier_messaging::state::AppState;

/// Temporary uploads nobody claimed within a day are swept hourly.
const TEMPORARY_FILE_MAX_AGE_HOURS: i64 = 24;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = MessagingConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let mailer = SmtpMailer::from_config(&config).expect("failed to build mailer");
    let files = LocalFileStore::new(&config.files_root);

    let state = AppState {
        db,
        hub: Arc::new(Hub::new()),
        files: files.clone(),
        mailer,
        jwt_secret: config.jwt_secret,
        jwt_access_token_ttl_secs: config.jwt_access_token_ttl_secs,
    };

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let files = files.clone();
            spawn_logged("clean-temporary-files", async move {
                let removed = files
                    .clean_temporary(TEMPORARY_FILE_MAX_AGE_HOURS)
                    .await
                    .map_err(anyhow::Error::new)?;
                if removed > 0 {
                    info!(removed, "cleaned stale temporary files");
                }
                Ok(())
            });
        }
    });

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("messaging service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}

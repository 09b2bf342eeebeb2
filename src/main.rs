use std::sync::Arc;

use dotenvy::dotenv;
use snafu::ResultExt;
use tokio::net::TcpListener;

use dripcourse::api::{self, App};
use dripcourse::config;
use dripcourse::database::Database;
use dripcourse::error::{ApplicationError, BindAddressSnafu, ConnectDatabaseSnafu, HttpClientSnafu, WebServerSnafu};
use dripcourse::logger;
use dripcourse::notifier::WhopNotifier;
use dripcourse::scheduler::DailyScheduler;
use dripcourse::service::{AccessGate, UnlockPass};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = config::load()?;

    let _guard = logger::init(&config)?;

    let database = Database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;
    let notifier = WhopNotifier::from_config(&config.whop).context(HttpClientSnafu)?;
    let calendar = config.schedule.calendar();

    let pass = Arc::new(UnlockPass::new(
        database.clone(),
        notifier,
        calendar,
        config.schedule.concurrency,
        config.schedule.catch_up_days,
    ));
    let scheduler = DailyScheduler::spawn(pass.clone(), config.schedule.run_at.0);

    let app = App::new(AccessGate::new(database, calendar), pass, config.cron_secret.clone());

    let listener = TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu { address: config.host })?;
    tracing::info!(address = %config.host, "listening on {}", config.host);

    axum::serve(listener, api::router(Arc::new(app)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(WebServerSnafu)?;

    scheduler.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "cannot listen for the shutdown signal");
    }

    tracing::info!("shutting down");
}

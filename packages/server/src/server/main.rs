// Main entry point for the SLURM proxy server

use std::sync::Arc;

use anyhow::{Context, Result};
use proxy_core::kernel::jobs::reconciler::{start_scheduler, Reconciler};
use proxy_core::kernel::jobs::PgJobStore;
use proxy_core::kernel::notify::AmqpNotifier;
use proxy_core::kernel::slurm::rest::{RestConfig, RestSchedulerClient};
use proxy_core::kernel::slurm::ssh::SshSchedulerClient;
use proxy_core::kernel::slurm::SchedulerClient;
use proxy_core::kernel::{ServerDeps, TaskRegistry};
use proxy_core::server::build_app;
use proxy_core::{Config, SubmitBackend};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,proxy_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(app = %config.app_name, "Starting SLURM proxy");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database ready");

    // Scheduler backend selected by configuration
    let scheduler: Arc<dyn SchedulerClient> = match config.submit_backend {
        SubmitBackend::Ssh => {
            tracing::info!(host = %config.ssh.hostname, "Using the SSH scheduler backend");
            Arc::new(SshSchedulerClient::connect_with(config.ssh.clone()))
        }
        SubmitBackend::Rest => {
            let base_url = config
                .slurm_rest_url
                .clone()
                .context("SLURM_REST_URL must be set when SUBMIT_BACKEND=rest")?;
            tracing::info!(url = %base_url, "Using the REST scheduler backend");
            Arc::new(RestSchedulerClient::new(RestConfig {
                base_url,
                user_name: config.ssh.username.clone(),
                token: config.slurm_rest_token.clone(),
            }))
        }
    };

    let tasks = Arc::new(TaskRegistry::builtin());
    let notifier = Arc::new(AmqpNotifier::new(config.amqp.clone(), Arc::clone(&tasks)));
    let store = Arc::new(PgJobStore::new(pool));

    let deps = Arc::new(ServerDeps::new(store, scheduler, notifier, tasks));

    // Background reconciliation on the polling interval
    let reconciler = Arc::new(Reconciler::new(&deps));
    let _scheduler_handle = start_scheduler(reconciler, config.polling_interval)
        .await
        .context("Failed to start the reconciliation scheduler")?;

    // Build application and serve
    let app = build_app(deps);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

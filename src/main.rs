//! # Chat Gateway Main Entry Point
//!
//! Wires the dispatch core together and runs it until interrupted: config,
//! database, adapter registry, queue, worker pool, recovery scanner, and
//! the retry planner tick.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use chat_gateway::adapters::AdapterRegistry;
use chat_gateway::config::{AppConfig, ConfigLoader};
use chat_gateway::dispatch::{
    DispatchQueue, RecoveryScanner, RetryPlanner, ScannerConfig, WebhookNotifier, WorkerPool,
    WorkerPoolConfig,
};
use chat_gateway::repositories::{
    MessageTransactionRepository, ProviderRepository, UserProviderRepository,
};
use chat_gateway::{db, logging};

#[derive(Parser)]
#[command(name = "chat-gateway")]
#[command(about = "Multi-provider message dispatch core")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    logging::init_subscriber(&config);

    let db = db::init_pool(&config).await?;

    if let Some(command) = cli.command {
        match command {
            Commands::Migrate { action } => {
                handle_migrate_command(&db, action).await?;
                return Ok(());
            }
        }
    }

    // Run migrations automatically for local and test profiles.
    if config.profile == "local" || config.profile == "test" {
        info!(profile = %config.profile, "Running migrations automatically");
        Migrator::up(&db, None).await?;
    }

    db::health_check(&db).await?;

    if let Ok(redacted) = config.redacted_json() {
        info!(profile = %config.profile, config = %redacted, "Loaded configuration");
    }

    run_core(config, db).await;
    Ok(())
}

/// Builds the dispatch core and runs it until ctrl-c.
async fn run_core(config: AppConfig, db: DatabaseConnection) {
    let db = Arc::new(db);

    let providers = ProviderRepository::new(db.clone());
    let user_providers = UserProviderRepository::new(db.clone());
    let transactions = MessageTransactionRepository::new(db.clone());

    let registry = Arc::new(AdapterRegistry::with_defaults());
    let queue = DispatchQueue::new(config.queue_capacity);
    let notifier = WebhookNotifier::new(user_providers.clone());

    let worker_pool = WorkerPool::new(
        queue.clone(),
        providers.clone(),
        user_providers.clone(),
        transactions.clone(),
        registry,
        notifier,
        WorkerPoolConfig {
            worker_count: config.worker_count,
            retry_backoff: chrono::Duration::seconds(config.retry_backoff_seconds),
        },
    );

    let scanner = RecoveryScanner::new(
        transactions.clone(),
        user_providers.clone(),
        queue.clone(),
        ScannerConfig {
            interval_seconds: config.scanner_interval_seconds,
            ..Default::default()
        },
    );

    let retry_planner = RetryPlanner::new(transactions, user_providers, providers, queue.clone());

    let shutdown = CancellationToken::new();

    let worker_handles = worker_pool.spawn(shutdown.clone());
    let scanner_handle = tokio::spawn(scanner.run(shutdown.clone()));

    let retry_shutdown = shutdown.clone();
    let retry_tick = TokioDuration::from_secs(config.retry_tick_seconds);
    let retry_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = retry_shutdown.cancelled() => break,
                _ = sleep(retry_tick) => {
                    if let Err(e) = retry_planner.retry_failed().await {
                        error!(error = %e, "Retry planner tick failed");
                    }
                }
            }
        }
    });

    info!("Dispatch core running, press ctrl-c to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("Shutting down dispatch core");
    shutdown.cancel();
    queue.close().await;

    for handle in worker_handles {
        let _ = handle.await;
    }
    let _ = scanner_handle.await;
    let _ = retry_handle.await;

    info!("Dispatch core shutdown complete");
}

async fn handle_migrate_command(
    db: &DatabaseConnection,
    action: MigrateAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MigrateAction::Up => {
            println!("Applying migrations...");
            Migrator::up(db, None).await?;
            println!("All migrations applied successfully");
        }
        MigrateAction::Down => {
            println!("Rolling back last migration...");
            Migrator::down(db, Some(1)).await?;
            println!("Migration rolled back successfully");
        }
        MigrateAction::Status => {
            println!("Checking migration status...");
            let applied = Migrator::get_applied_migrations(db).await?;
            let pending = Migrator::get_pending_migrations(db).await?;

            if applied.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations: {} migration(s)", applied.len());
            }

            if pending.is_empty() {
                println!("No pending migrations");
            } else {
                println!("Pending migrations: {} migration(s)", pending.len());
            }
        }
    }
    Ok(())
}

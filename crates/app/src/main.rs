use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use engine::{
    AuthGuard, MutationCoordinator, Notification, Notifier, QueryCache, RateLimiter, SecurityLog,
    SqlStore,
};
use migration::{Migrator, MigratorTrait};

use crate::{cli::Cli, error::Result, settings::Settings};

mod cli;
mod commands;
mod error;
mod settings;

/// Prints notifications where the user sees them, away from command output.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("{notification}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !err.already_reported() {
                eprintln!("error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.global)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tenant_ledger={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = connect(&settings.database).await?;
    let log = Arc::new(SecurityLog::new());
    let store = Arc::new(
        SqlStore::builder()
            .database(db)
            .security_log(log.clone())
            .build(),
    );
    let coordinator = MutationCoordinator::new(store, QueryCache::new(), Arc::new(StderrNotifier))
        .with_security_log(log.clone());

    match settings.user.as_deref() {
        Some(user) => {
            let guard = AuthGuard::new(RateLimiter::sign_in(), log);
            guard.sign_in(&coordinator, user)?;
        }
        None => tracing::warn!("no user configured, running signed out"),
    }

    commands::dispatch(cli.command, &coordinator, &settings).await
}

async fn connect(config: &settings::Database) -> Result<sea_orm::DatabaseConnection> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    tracing::debug!("database ready at {}", config.url());
    Ok(database)
}

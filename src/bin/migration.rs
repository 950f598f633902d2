use anyhow::{Context, Result};
use cds_storefront::{config, db, migrator::Migrator};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Schema management for the storefront database
#[derive(Debug, Parser)]
#[command(name = "migration", version, about)]
struct Cli {
    /// Database URL; defaults to the configured `database_url`
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back migrations
    Down {
        /// Number of migrations to roll back
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let mut db_cfg = db::DbConfig::from(&cfg);
    if let Some(url) = cli.database_url {
        db_cfg.url = url;
    }

    info!("Connecting to database for schema management");
    let pool = db::establish_connection_with_config(&db_cfg)
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            Migrator::up(&pool, None).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => Migrator::status(&pool).await?,
        Command::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Schema recreated");
        }
    }

    Ok(())
}

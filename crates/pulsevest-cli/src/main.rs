use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulsevest-cli")]
#[command(about = "PulseVest operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the configured database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let config = pulsevest_core::load_app_config()?;
    let pool_config = pulsevest_db::PoolConfig::from_app_config(&config);
    let pool = pulsevest_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        DbCommands::Ping => {
            pulsevest_db::ping(&pool).await?;
            tracing::info!("database reachable");
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = pulsevest_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
    }

    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await?,
        None => println!("pulsevest-cli: run with --help for available commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;

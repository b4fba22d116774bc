use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use uuid::Uuid;

use backoffice_api as api;

/// Issues or rotates the API key for a user by writing to the database
/// directly. The HTTP rotation endpoint needs a valid key to call, so the
/// very first key for a user has to come from here.
#[derive(Parser)]
#[command(
    name = "keygen",
    about = "Issue or rotate a back-office API key for a user",
    version
)]
struct Cli {
    /// User to issue the key for
    #[arg(long, value_parser = clap::value_parser!(Uuid))]
    user_id: Uuid,

    /// Database to write to; defaults to the configured database_url
    #[arg(long)]
    database_url: Option<String>,

    /// Run pending migrations before issuing, for fresh databases
    #[arg(long)]
    migrate: bool,

    /// Print nothing but the key itself
    #[arg(long)]
    key_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = api::config::load_config().context("failed to load configuration")?;
    let database_url = cli
        .database_url
        .unwrap_or_else(|| cfg.database_url().to_string());

    let pool = api::db::establish_connection(&database_url)
        .await
        .context("failed to connect to the database")?;

    if cli.migrate {
        api::db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
    }

    let auth = api::auth::AuthService::new(Arc::new(pool), cfg.api_key_prefix.clone());
    let record = auth
        .rotate_key(cli.user_id)
        .await
        .context("failed to issue API key")?;

    if cli.key_only {
        println!("{}", record.key);
    } else {
        println!("Issued API key for user {}", record.user_id);
        println!("{}", record.key);
    }

    Ok(())
}

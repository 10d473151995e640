//! CLI administration tool for snaplink.
//!
//! Issues session credentials, repairs the resolution cache and checks the
//! database without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Issue a session credential for owner 42
//! cargo run --bin admin -- session issue --owner 42
//!
//! # Rewrite cache entries of all live links from the record store
//! cargo run --bin admin -- cache reconcile --batch-size 500
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see `snaplink::config`): the database connection and
//! `SESSION_SIGNING_SECRET` are required. `cache reconcile` also requires `REDIS_URL`.

use snaplink::application::services::AuthService;
use snaplink::config::{self, Config, mask_connection_string};
use snaplink::domain::repositories::LinkRepository;
use snaplink::infrastructure::persistence::PgLinkRepository;
use snaplink::server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc;

/// CLI tool for managing snaplink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Session credentials
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Resolution cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Issue a bearer credential for an owner
    Issue {
        /// Owner id the credential authenticates as
        #[arg(short, long)]
        owner: i64,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Rewrite cache entries of every live link from the record store
    Reconcile {
        /// Records loaded per query
        #[arg(short, long, default_value_t = 500)]
        batch_size: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .init();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    match cli.command {
        Commands::Session { action } => handle_session_action(action, &config),
        Commands::Cache { action } => handle_cache_action(action, &config).await?,
        Commands::Db { action } => handle_db_action(action, &config).await?,
    }

    Ok(())
}

fn handle_session_action(action: SessionAction, config: &Config) {
    match action {
        SessionAction::Issue { owner } => {
            let auth = AuthService::new(
                config.session_signing_secret.clone(),
                config.session_ttl_seconds,
            );
            let credential = auth.issue(owner);

            println!("{}", "🔑 Session credential".bright_blue().bold());
            println!();
            println!("  Owner:      {}", owner.to_string().cyan());
            println!(
                "  Expires in: {}",
                format!("{}s", config.session_ttl_seconds).bright_black()
            );
            println!("  Credential: {}", credential.bright_yellow().bold());
            println!();
            println!("{}", "Example:".bright_white());
            println!(
                "  curl -H \"Authorization: Bearer {}\" {}/api/url",
                credential.bright_yellow(),
                config.app_url.trim_end_matches('/')
            );
            println!();
        }
    }
}

/// Rewrites cache entries from the record store.
///
/// The record store wins: entries are recreated with the remaining lifetime of
/// their record, destinations changed in the cache only are overwritten.
async fn handle_cache_action(action: CacheAction, config: &Config) -> Result<()> {
    match action {
        CacheAction::Reconcile { batch_size, yes } => {
            println!("{}", "♻️  Reconcile resolution cache".bright_blue().bold());
            println!();
            println!(
                "  Database: {}",
                mask_connection_string(&config.database_url).bright_black()
            );
            let redis_url = reconcile_target(config.redis_url.as_deref())?;
            println!("  Redis:    {}", mask_connection_string(redis_url).bright_black());
            println!();

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Rewrite cache entries for all live links?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "❌ Cancelled".red());
                    return Ok(());
                }
            }

            let pool = server::connect_database(config).await?;
            let kv_store = server::connect_key_value_store(config).await?;
            let repository: Arc<dyn LinkRepository> = Arc::new(PgLinkRepository::new(
                Arc::new(pool),
                config.store_timeout(),
            ));

            // Reconciliation never resolves tokens, so no click is ever queued.
            let (click_tx, _click_rx) = mpsc::channel(1);
            let service = server::build_link_service(config, repository, kv_store, click_tx);

            let report = service
                .reconcile_cache(batch_size)
                .await
                .map_err(|e| anyhow::anyhow!("Reconciliation failed: {}", e))?;

            println!(
                "  Scanned:   {}",
                report.scanned.to_string().bright_white().bold()
            );
            println!(
                "  Rewritten: {}",
                report.rewritten.to_string().bright_green().bold()
            );
            if report.failed > 0 {
                println!("  Failed:    {}", report.failed.to_string().red().bold());
            }
            println!();
            println!("{}", "✅ Cache reconciled".green().bold());
        }
    }

    Ok(())
}

/// Redis instance a cache reconcile writes to.
///
/// Without `REDIS_URL` the server keeps its cache in process memory, which a
/// separate admin process cannot reach.
fn reconcile_target(redis_url: Option<&str>) -> Result<&str> {
    redis_url.context(
        "REDIS_URL is not set: the resolution cache lives inside the server process \
         and cannot be reconciled from here",
    )
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, config: &Config) -> Result<()> {
    let pool = PgPool::connect(&config.database_url).await?;

    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(&pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(&pool)
                .await?;

            let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
                .fetch_one(&pool)
                .await?;

            let clicks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM link_clicks")
                .fetch_one(&pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Links:      {}", links.to_string().bright_green().bold());
            println!("  Clicks:     {}", clicks.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_requires_redis() {
        let err = reconcile_target(None).unwrap_err();
        assert!(err.to_string().contains("REDIS_URL is not set"));

        assert_eq!(
            reconcile_target(Some("redis://cache:6379")).unwrap(),
            "redis://cache:6379"
        );
    }
}

mod config;
mod serve_cmd;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use mentor_core::cache::MemoryPlanCache;
use mentor_core::llm::GeminiBackend;
use mentor_core::pipeline::StudyPlanPipeline;
use mentor_core::plan::PgPlanStore;
use mentor_core::token;
use mentor_db::pool;

use config::MentorConfig;

#[derive(Parser)]
#[command(name = "mentor", about = "AI study-plan generation service")]
struct Cli {
    /// Database URL (overrides MENTOR_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a mentor config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/mentor")]
        db_url: String,
        /// Gemini API key to store in the config file
        #[arg(long)]
        gemini_api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the mentor database (requires config file or env vars)
    DbInit,
    /// Print a bearer token for a user
    Token {
        /// User ID (UUID) the token identifies
        user_id: String,
    },
    /// Start the HTTP API server
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

/// Execute the `mentor init` command: write config file.
fn cmd_init(db_url: &str, gemini_api_key: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let token_secret = config::generate_token_secret();
    let has_api_key = gemini_api_key.is_some();

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
            max_connections: None,
        },
        auth: config::AuthSection {
            token_secret: token_secret.clone(),
        },
        ai: config::AiSection {
            api_key: gemini_api_key,
            ..config::AiSection::default()
        },
        cache: config::CacheSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  auth.token_secret = {}...{}", &token_secret[..8], &token_secret[56..]);
    if !has_api_key {
        println!("  ai.api_key not set; export MENTOR_GEMINI_API_KEY before `mentor serve`.");
    }
    println!();
    println!("Next: run `mentor db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `mentor db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = MentorConfig::resolve(cli_db_url)?;

    println!("Initializing mentor database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let summary = pool::store_summary(&db_pool).await?;
    println!(
        "Database ready: {} study plan(s) ({} AI-generated), {} task(s).",
        summary.study_plans, summary.ai_generated_plans, summary.study_tasks
    );

    db_pool.close().await;

    println!("mentor db-init complete.");
    Ok(())
}

/// Execute the `mentor token` command: print a bearer token.
fn cmd_token(cli_db_url: Option<&str>, user_id: &str) -> anyhow::Result<()> {
    let resolved = MentorConfig::resolve(cli_db_url)?;
    let user_id =
        uuid::Uuid::parse_str(user_id).with_context(|| format!("invalid user ID: {user_id}"))?;
    println!("{}", token::generate_token(&resolved.token_config, user_id));
    Ok(())
}

/// Execute the `mentor serve` command: wire the pipeline and run the API.
async fn cmd_serve(cli_db_url: Option<&str>, bind: &str, port: u16) -> anyhow::Result<()> {
    let resolved = MentorConfig::resolve(cli_db_url)?;

    if resolved.gemini.api_key.is_none() {
        tracing::warn!("no Gemini API key configured; generation requests will fail with 502");
    }

    let db_pool = pool::create_pool(&resolved.db_config).await?;

    let backend = GeminiBackend::new(resolved.gemini).context("failed to build Gemini client")?;
    let cache = MemoryPlanCache::new(resolved.cache_max_entries);
    let pipeline = StudyPlanPipeline::new(Arc::new(backend), Arc::new(cache), resolved.pipeline)
        .with_store(Arc::new(PgPlanStore::new(db_pool.clone())));

    let state = serve_cmd::AppState::new(pipeline, db_pool.clone(), resolved.token_config);
    let result = serve_cmd::run_serve(state, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            gemini_api_key,
            force,
        } => {
            cmd_init(&db_url, gemini_api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Token { user_id } => {
            cmd_token(cli.database_url.as_deref(), &user_id)?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), &bind, port).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that mutate process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["mentor", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind, port } => {
                assert_eq!(bind, "127.0.0.1");
                assert_eq!(port, 8000);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn database_url_is_global() {
        let cli =
            Cli::try_parse_from(["mentor", "db-init", "--database-url", "postgresql://x/y"])
                .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("postgresql://x/y"));
    }
}

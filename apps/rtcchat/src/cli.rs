//! # Command Line
//!
//! `rtcchat <command>`:
//! - `serve`: run the HTTP/WebSocket server
//! - `init`: create an empty database
//! - `status`: print store counters
//! - `cleanup`: run the size-triggered message cleanup once
//! - `create-user`: register an account without the web client

use crate::api;
use crate::config::{
    DEFAULT_BCRYPT_COST, DEFAULT_BIND, DEFAULT_BUS_CAPACITY, DEFAULT_LOGIN_RATE,
    DEFAULT_TOKEN_TTL_DAYS, Environment, ServerConfig, VapidConfig, split_list,
};
use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand};
use rtcchat_core::{Store, validate_credentials};
use serde_json::json;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type CliResult = Result<(), Box<dyn Error>>;

pub const DEFAULT_DB_PATH: &str = "rtcchat.redb";

#[derive(Debug, Parser)]
#[command(name = "rtcchat", version, about = "Two-party real-time chat server")]
pub struct Cli {
    /// Database file.
    #[arg(long, global = true, env = "RTCCHAT_DB", default_value = DEFAULT_DB_PATH)]
    pub database: PathBuf,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the server.
    Serve(ServeArgs),

    /// Create an empty database.
    Init {
        /// Replace an existing database file.
        #[arg(long)]
        force: bool,
    },

    /// Show user, connection and message counts.
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Delete read conversations if the database is over its size limit.
    Cleanup {
        /// Limit in MiB; defaults to the environment's limit.
        #[arg(long)]
        limit_mb: Option<u64>,

        #[arg(long, env = "RTCCHAT_ENV", value_enum, default_value_t = Environment::Development)]
        env: Environment,
    },

    /// Register a user.
    CreateUser {
        name: String,

        #[arg(long, env = "RTCCHAT_NEW_USER_PASSWORD")]
        password: String,
    },
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "RTCCHAT_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    #[arg(long, env = "RTCCHAT_ENV", value_enum, default_value_t = Environment::Development)]
    pub env: Environment,

    /// JWT signing secret.
    #[arg(long, env = "TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: String,

    #[arg(long, env = "RTCCHAT_TOKEN_TTL_DAYS", default_value_t = DEFAULT_TOKEN_TTL_DAYS)]
    pub token_ttl_days: u32,

    /// VAPID private key (PEM). Push notifications are off without it.
    #[arg(long, env = "VAPID_PRIVATE_KEY_PEM", hide_env_values = true)]
    pub vapid_private_key_pem: Option<String>,

    #[arg(long, env = "VAPID_SUBJECT", default_value = "mailto:admin@localhost")]
    pub vapid_subject: String,

    /// Directory of the prebuilt frontend.
    #[arg(long, env = "RTCCHAT_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    #[arg(long, env = "RTCCHAT_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Comma separated user names allowed to run maintenance mutations.
    #[arg(long, env = "RTCCHAT_ADMINS", default_value = "")]
    pub admins: String,

    /// Comma separated allowed origins; empty allows any.
    #[arg(long, env = "RTCCHAT_CORS_ORIGINS", default_value = "")]
    pub cors_origins: String,

    /// Login attempts per minute, server-wide.
    #[arg(long, env = "RTCCHAT_LOGIN_RATE", default_value_t = DEFAULT_LOGIN_RATE)]
    pub login_rate: u32,

    #[arg(long, env = "RTCCHAT_BUS_CAPACITY", default_value_t = DEFAULT_BUS_CAPACITY)]
    pub bus_capacity: usize,
}

impl ServeArgs {
    pub fn into_config(self) -> ServerConfig {
        let vapid = self.vapid_private_key_pem.map(|pem| VapidConfig {
            private_key_pem: pem,
            subject: self.vapid_subject,
        });
        ServerConfig {
            bind: self.bind,
            environment: self.env,
            token_secret: self.token_secret,
            token_ttl_days: self.token_ttl_days,
            vapid,
            static_dir: self.static_dir,
            admin_token: self.admin_token.filter(|t| !t.is_empty()),
            admins: split_list(&self.admins),
            cors_origins: split_list(&self.cors_origins),
            login_rate_per_minute: self.login_rate,
            bus_capacity: self.bus_capacity,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

pub async fn cmd_serve(db_path: &Path, args: ServeArgs) -> CliResult {
    let config = args.into_config();
    config.validate()?;
    let store = Arc::new(Store::open(db_path)?);
    tracing::info!(path = %db_path.display(), env = ?config.environment, "Database opened");
    api::serve(store, config).await
}

pub fn cmd_init(db_path: &Path, force: bool) -> CliResult {
    if db_path.exists() {
        if !force {
            return Err(format!(
                "database already exists at {} (use --force to replace it)",
                db_path.display()
            )
            .into());
        }
        std::fs::remove_file(db_path)?;
    }
    Store::open(db_path)?;
    println!("Initialized database at {}", db_path.display());
    Ok(())
}

pub fn cmd_status(db_path: &Path, json_output: bool) -> CliResult {
    if !db_path.exists() {
        return Err(format!("no database at {}", db_path.display()).into());
    }
    let stats = Store::open(db_path)?.stats()?;
    if json_output {
        let out = json!({
            "database": db_path.display().to_string(),
            "users": stats.users,
            "connections": stats.connections,
            "messages": stats.messages,
            "subscriptions": stats.subscriptions,
            "size_bytes": stats.size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Database:      {}", db_path.display());
        println!("Users:         {}", stats.users);
        println!("Connections:   {}", stats.connections);
        println!("Messages:      {}", stats.messages);
        println!("Subscriptions: {}", stats.subscriptions);
        println!("Size:          {} bytes", stats.size_bytes);
    }
    Ok(())
}

pub fn cmd_cleanup(db_path: &Path, limit_mb: Option<u64>, env: Environment) -> CliResult {
    let limit_bytes = limit_mb
        .map(|mb| mb.saturating_mul(1024 * 1024))
        .unwrap_or_else(|| env.db_size_limit_bytes());
    let outcome = Store::open(db_path)?.cleanup(limit_bytes)?;
    if outcome.performed {
        println!(
            "Cleanup removed {} messages ({} of {} bytes)",
            outcome.messages_deleted, outcome.size_bytes, outcome.limit_bytes
        );
    } else {
        println!(
            "No cleanup needed ({} of {} bytes)",
            outcome.size_bytes, outcome.limit_bytes
        );
    }
    Ok(())
}

pub async fn cmd_create_user(db_path: &Path, name: &str, password: &str) -> CliResult {
    let name = validate_credentials(name, password)?;
    let store = Store::open(db_path)?;
    let hash = api::auth::hash_password(password.to_string(), DEFAULT_BCRYPT_COST).await?;
    let user = store.create_user(&name, &hash, None)?;
    println!("Created user {} with id {}", user.name, user.id);
    Ok(())
}

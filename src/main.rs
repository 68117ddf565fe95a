//! clinicgate CLI entry point

mod cli;

use crate::cli::{AccountCommands, Cli, Commands, TokenCommands};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clinicgate::auth::{Account, PasswordHasher, Role, TokenCodec};
use clinicgate::config::ttl_from_hours;
use clinicgate::storage::{AccountStore, PostgresConfig, PostgresStore};
use clap::Parser;
use std::io::BufRead;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Helper to get database config lazily (only when needed)
    let get_db_config = || -> Result<PostgresConfig> {
        if let Some(url) = &cli.database_url {
            PostgresConfig::from_url(url).context("Invalid DATABASE_URL")
        } else {
            PostgresConfig::from_env().context("DATABASE_URL not set")
        }
    };

    let hasher = || {
        PasswordHasher::with_cost(cli.hash_work_factor, cli.hash_memory_kib)
            .context("Invalid hashing parameters")
    };

    match &cli.command {
        Commands::Init => init(get_db_config()?).await,
        Commands::Account { command } => match command {
            AccountCommands::Create {
                email,
                name,
                role,
                password,
            } => {
                let password = password_or_stdin(password.clone())?;
                create_account(get_db_config()?, hasher()?, email, name, *role, &password).await
            }
        },
        Commands::HashPassword { password } => {
            let password = password_or_stdin(password.clone())?;
            let digest = hasher()?.hash(&password)?;
            println!("{}", digest);
            Ok(())
        }
        Commands::Token { command } => match command {
            TokenCommands::Issue {
                subject,
                role,
                ttl_hours,
                secret,
            } => issue_token(subject, *role, *ttl_hours, secret),
            TokenCommands::Verify { token, secret } => verify_token(token, secret),
        },
    }
}

fn password_or_stdin(password: Option<String>) -> Result<String> {
    let password = match password {
        Some(p) => p,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}

async fn init(db_config: PostgresConfig) -> Result<()> {
    let _store = PostgresStore::new(db_config).await?;
    println!("Database schema initialized successfully");
    Ok(())
}

async fn create_account(
    db_config: PostgresConfig,
    hasher: PasswordHasher,
    email: &str,
    name: &str,
    role: Role,
    password: &str,
) -> Result<()> {
    let digest = hasher.hash(password)?;
    let account = Account::new(email, name, role, digest);

    let store = PostgresStore::new(db_config).await?;
    store
        .create_account(&account)
        .await
        .with_context(|| format!("Failed to create account {}", email))?;

    println!("Created account {}", email);
    println!("Name: {}", name);
    println!("Role: {}", role);
    Ok(())
}

fn issue_token(subject: &str, role: Role, ttl_hours: u64, secret: &str) -> Result<()> {
    if secret.is_empty() {
        anyhow::bail!("CLINICGATE_SECRET must not be empty");
    }
    let ttl = ttl_from_hours(ttl_hours).context("Invalid token lifetime")?;

    let codec = TokenCodec::new(secret.as_bytes(), ttl);
    let now = Utc::now();
    let token = codec.issue(subject, role, now);
    let claims = codec.verify(&token, now).context("Issued token failed to verify")?;

    println!("{}", token);
    println!();
    println!("Subject: {}", subject);
    println!("Role: {}", role);
    println!("Expires: {}", format_timestamp(claims.exp));
    Ok(())
}

fn verify_token(token: &str, secret: &str) -> Result<()> {
    // The ttl only matters when issuing
    let codec = TokenCodec::new(secret.as_bytes(), Duration::from_secs(1));
    let claims = codec
        .verify(token.trim(), Utc::now())
        .context("Token rejected")?;

    println!("Subject: {}", claims.sub);
    println!("Role: {}", claims.role);
    println!("Issued: {}", format_timestamp(claims.iat));
    println!("Not before: {}", format_timestamp(claims.nbf));
    println!("Expires: {}", format_timestamp(claims.exp));
    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

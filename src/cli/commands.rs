//! CLI command definitions

use clap::{Parser, Subcommand};
use clinicgate::auth::Role;
use clinicgate::config::{DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_WORK_FACTOR};

#[derive(Parser)]
#[command(name = "clinicgate")]
#[command(about = "clinicgate operator tool: schema, accounts and tokens", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Argon2 iterations for new password digests
    #[arg(long, env = "CLINICGATE_HASH_WORK_FACTOR", default_value_t = DEFAULT_HASH_WORK_FACTOR, global = true)]
    pub hash_work_factor: u32,

    /// Argon2 memory cost in KiB for new password digests
    #[arg(long, env = "CLINICGATE_HASH_MEMORY_KIB", default_value_t = DEFAULT_HASH_MEMORY_KIB, global = true)]
    pub hash_memory_kib: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema
    Init,

    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Print an Argon2 digest for a password (read from stdin if omitted)
    HashPassword {
        password: Option<String>,
    },

    /// Issue and inspect bearer tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Provision a new account
    ///
    /// Examples:
    ///   clinicgate account create --email nurse@example.com --name 'Nina Nurse' --role front_desk
    ///   echo "$PW" | clinicgate account create --email doc@example.com --name Doc --role clinician
    Create {
        /// Login identifier
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// front_desk or clinician
        #[arg(long, value_parser = parse_role)]
        role: Role,

        /// Initial password (read from stdin if omitted)
        #[arg(long, env = "CLINICGATE_ACCOUNT_PASSWORD")]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Sign a token without a login (for testing and service accounts)
    Issue {
        /// Account identifier to put in the token
        #[arg(long)]
        subject: String,

        /// front_desk or clinician
        #[arg(long, value_parser = parse_role)]
        role: Role,

        /// Token lifetime in hours
        #[arg(long, env = "CLINICGATE_TOKEN_TTL_HOURS", default_value_t = 24)]
        ttl_hours: u64,

        /// Token signing secret
        #[arg(long, env = "CLINICGATE_SECRET")]
        secret: String,
    },

    /// Verify a token and print its claims
    Verify {
        token: String,

        /// Token signing secret
        #[arg(long, env = "CLINICGATE_SECRET")]
        secret: String,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.to_lowercase().parse().map_err(|e: clinicgate::auth::UnknownRole| e.to_string())
}

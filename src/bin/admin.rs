//! CLI administration tool for storefront-gateway.
//!
//! Mints and inspects bearer tokens signed with the gateway's `JWT_SECRET`,
//! without going through the user service.
//!
//! # Usage
//!
//! ```bash
//! # Mint an admin token valid for 30 days
//! cargo run --bin admin -- token --id 5f1d7c2e9b1e8a0017a1b2c3 --admin --days 30
//!
//! # Check a token the gateway received
//! cargo run --bin admin -- verify eyJhbGciOiJIUzI1NiIs...
//! ```
//!
//! # Environment Variables
//!
//! - `JWT_SECRET` (required): token signing secret

use storefront_gateway::domain::entities::Principal;
use storefront_gateway::infrastructure::{Hs256Verifier, TokenClaims};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;

/// CLI tool for managing storefront-gateway credentials.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Mint a signed bearer token
    Token {
        /// User identifier placed in the `_id` claim
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,

        /// Lifetime in days; omit for a non-expiring token
        #[arg(long)]
        days: Option<i64>,
    },

    /// Verify a token and show the identity it carries
    Verify {
        /// The raw bearer token
        token: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
    let verifier = Hs256Verifier::new(secret.into_bytes());

    match cli.command {
        Commands::Token {
            id,
            name,
            email,
            admin,
            days,
        } => mint_token(&verifier, id, name, email, admin, days),
        Commands::Verify { token } => verify_token(&verifier, &token),
    }
}

/// Signs a token for the given identity and prints usage instructions.
fn mint_token(
    verifier: &Hs256Verifier,
    id: String,
    name: Option<String>,
    email: Option<String>,
    admin: bool,
    days: Option<i64>,
) -> Result<()> {
    let now = Utc::now();
    let claims = TokenClaims {
        id,
        name,
        email,
        is_admin: admin,
        iat: Some(now.timestamp()),
        exp: days.map(|d| (now + Duration::days(d)).timestamp()),
    };

    let token = verifier.sign(&claims).context("Failed to sign token")?;

    println!("{}", "Bearer token".bright_blue().bold());
    println!();
    println!("  ID:      {}", claims.id.cyan());
    println!(
        "  Role:    {}",
        if admin {
            "admin".bright_red()
        } else {
            "ordinary".green()
        }
    );
    match claims.exp {
        Some(exp) => println!("  Expires: {}", exp.to_string().bright_black()),
        None => println!("  Expires: {}", "never".yellow()),
    }
    println!();
    println!("  {}", token.bright_yellow().bold());
    println!();
    println!("{}", "Example:".bright_white());
    println!(
        "  curl -H \"Authorization: Bearer {}\" -F image=@photo.jpg http://localhost:5000/api/uploads",
        token.bright_yellow()
    );
    println!();

    Ok(())
}

/// Decodes a token with the configured secret.
fn verify_token(verifier: &Hs256Verifier, token: &str) -> Result<()> {
    match verifier.decode(token) {
        Ok(claims) => {
            let principal = Principal::from(claims);
            println!("{}", "Token is valid".green().bold());
            println!("  ID:    {}", principal.id.cyan());
            println!("  Role:  {:?}", principal.role);
            if let Some(name) = &principal.name {
                println!("  Name:  {name}");
            }
            if let Some(email) = &principal.email {
                println!("  Email: {email}");
            }
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "Token rejected:".red().bold(), e);
            anyhow::bail!("invalid token")
        }
    }
}

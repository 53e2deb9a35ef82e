//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod notifications;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// The variable every command reads the database URL from.
pub const DATABASE_URL_VAR: &str = "API_DATABASE_URL";

/// Load `.env`, read the database URL and connect.
///
/// Falls back to `DATABASE_URL` like the API server does.
///
/// # Errors
///
/// Returns an error if neither variable is set or the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar(DATABASE_URL_VAR))?;

    tracing::info!("Connecting to database...");
    Ok(exprz_api::db::create_pool(&database_url).await?)
}

/// Errors shared by the database-backed commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

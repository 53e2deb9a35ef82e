//! Admin rights management.
//!
//! Accounts are created through the signup flow; these commands only flip
//! the admin flag (and role) of an existing user. Tokens issued before the
//! change keep their old flag until they expire.

use exprz_api::db::{RepositoryError, UserRepository};
use exprz_core::Email;
use thiserror::Error;

use super::CommandError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] exprz_core::EmailError),

    #[error("No user with email: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Set the admin flag of the user with `email`.
///
/// # Errors
///
/// Returns an error if the email is invalid, no such user exists, or the
/// database fails.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let pool = super::connect().await?;

    let user = UserRepository::new(&pool)
        .set_admin(&email, is_admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        user_id = %user.id,
        email = %user.email,
        role = %user.role,
        "Admin flag set to {is_admin}"
    );
    Ok(())
}

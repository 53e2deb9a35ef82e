//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] exprz_core::EmailError),

    /// A signup field is missing or malformed.
    #[error("invalid signup: {0}")]
    InvalidSignup(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The username belongs to another account.
    #[error("username taken")]
    UsernameTaken,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// No pending signup matches the email and code.
    #[error("invalid otp")]
    InvalidOtp,

    /// The code matched but is past its expiry.
    #[error("otp expired")]
    OtpExpired,

    /// Resend requested for an email with no pending signup.
    #[error("no pending signup")]
    NoPendingSignup,

    /// Session token missing, malformed, or expired.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// Verification email could not be sent.
    #[error("email error: {0}")]
    Email(#[from] EmailError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

//! Authentication service.
//!
//! Signup is two-step: a request stores the hashed password with a 6-digit
//! code keyed by email, and the account only exists once the code is verified.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenService};

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use rand::Rng;
use sqlx::PgPool;

use exprz_core::{Email, OtpCode};

use crate::db::{OtpRepository, RepositoryError, UserRepository};
use crate::models::otp::PendingSignup;
use crate::models::user::{SignupRequest, User};
use crate::services::email::EmailService;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum username length (column width).
const MAX_USERNAME_LENGTH: usize = 50;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    otps: OtpRepository<'a>,
    email: &'a EmailService,
    otp_ttl: Duration,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService, otp_ttl: Duration) -> Self {
        Self {
            users: UserRepository::new(pool),
            otps: OtpRepository::new(pool),
            email,
            otp_ttl,
        }
    }

    /// Start a signup: store the pending account and email a code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSignup`, `InvalidEmail` or `WeakPassword`
    /// for bad input.
    /// Returns `AuthError::UserAlreadyExists` or `UsernameTaken` on conflicts.
    /// Returns `AuthError::Email` if the code cannot be sent.
    pub async fn request_signup(&self, request: SignupRequest) -> Result<(), AuthError> {
        let signup = ValidSignup::parse(request)?;

        if self.users.get_by_email(&signup.email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }
        if self.users.username_exists(&signup.username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(&signup.password)?;
        let pending = PendingSignup::user(signup.username, password_hash, signup.phone);

        let code = generate_otp(&mut rand::rng());
        let expires_at = Utc::now() + self.otp_ttl_chrono();
        self.otps
            .upsert(&signup.email, code.as_str(), expires_at, &pending)
            .await?;

        self.email
            .send_otp(signup.email.as_str(), code.as_str(), self.otp_minutes())
            .await?;

        tracing::info!(email = %signup.email, "Signup code issued");
        Ok(())
    }

    /// Complete a signup by checking the emailed code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOtp` if nothing matches.
    /// Returns `AuthError::OtpExpired` if the code is stale (the row is removed).
    /// Returns `AuthError::UserAlreadyExists` if the account was created meanwhile.
    pub async fn verify_signup(&self, email: &str, code: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidOtp)?;
        let code = OtpCode::parse(code).map_err(|_| AuthError::InvalidOtp)?;

        let record = self
            .otps
            .find_match(&email, code.as_str())
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        if record.is_expired_at(Utc::now()) {
            self.otps.delete(record.id).await?;
            return Err(AuthError::OtpExpired);
        }

        let user = self
            .users
            .create_from_signup(&email, &record.pending)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Issue a fresh code for a pending signup.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the account exists.
    /// Returns `AuthError::NoPendingSignup` if there is nothing to resend.
    /// Returns `AuthError::Email` if the code cannot be sent.
    pub async fn resend_code(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let code = generate_otp(&mut rand::rng());
        let expires_at = Utc::now() + self.otp_ttl_chrono();
        self.otps
            .refresh_code(&email, code.as_str(), expires_at)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::NoPendingSignup,
                other => AuthError::Repository(other),
            })?;

        self.email
            .send_otp(email.as_str(), code.as_str(), self.otp_minutes())
            .await?;

        Ok(())
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &hash)?;

        Ok(user)
    }

    fn otp_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.otp_ttl).unwrap_or(chrono::Duration::minutes(5))
    }

    fn otp_minutes(&self) -> u64 {
        self.otp_ttl.as_secs().div_ceil(60)
    }
}

/// Signup fields after validation.
#[derive(Debug)]
struct ValidSignup {
    username: String,
    email: Email,
    password: String,
    phone: String,
}

impl ValidSignup {
    fn parse(request: SignupRequest) -> Result<Self, AuthError> {
        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidSignup("Username is required".to_string()))?;
        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(AuthError::InvalidSignup(format!(
                "Username must be at most {MAX_USERNAME_LENGTH} characters"
            )));
        }

        let email = request
            .email
            .as_deref()
            .ok_or_else(|| AuthError::InvalidSignup("Email is required".to_string()))?;
        let email = Email::parse(email)?;

        let password = request.password.unwrap_or_default();
        validate_password(&password)?;

        let phone = request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidSignup("Phone is required".to_string()))?;

        Ok(Self {
            username: username.to_string(),
            email,
            password,
            phone: phone.to_string(),
        })
    }
}

/// Generate a random 6-digit code.
pub fn generate_otp(rng: &mut impl Rng) -> OtpCode {
    OtpCode::from_number(rng.random_range(0..1_000_000))
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

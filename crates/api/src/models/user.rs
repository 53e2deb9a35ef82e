//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exprz_core::{Email, UserId, UserRole};

/// A shop account.
///
/// The password hash is never part of this type; it is only loaded for login.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: UserRole,
    pub is_admin: bool,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/auth/signup-request-otp`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
}

/// Body of `POST /api/auth/verify-otp`.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

/// Body of `POST /api/auth/resend-otp`.
#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub email: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Account details plus a fresh session token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub phone: String,
    pub is_admin: bool,
    pub token: String,
}

impl AuthResponse {
    #[must_use]
    pub fn new(user: User, token: String) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            is_admin: user.is_admin,
            token,
        }
    }
}

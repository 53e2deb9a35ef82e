//! OTP repository: pending signups keyed by email.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use exprz_core::{Email, OtpId};

use super::RepositoryError;
use crate::models::otp::{OtpRecord, PendingSignup};

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    id: OtpId,
    email: String,
    code: String,
    expires_at: DateTime<Utc>,
    pending_signup: String,
}

impl TryFrom<OtpRow> for OtpRecord {
    type Error = RepositoryError;

    fn try_from(row: OtpRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let pending: PendingSignup = serde_json::from_str(&row.pending_signup).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid pending signup data: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            code: row.code,
            expires_at: row.expires_at,
            pending,
        })
    }
}

/// Repository for `otp_codes`.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a code for `email`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        email: &Email,
        code: &str,
        expires_at: DateTime<Utc>,
        pending: &PendingSignup,
    ) -> Result<(), RepositoryError> {
        let pending_json = serde_json::to_string(pending).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize pending signup: {e}"))
        })?;

        sqlx::query(
            r"
            INSERT INTO otp_codes (email, code, expires_at, pending_signup)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET code = EXCLUDED.code,
                expires_at = EXCLUDED.expires_at,
                pending_signup = EXCLUDED.pending_signup,
                updated_at = NOW()
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .bind(expires_at)
        .bind(pending_json)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace the code and expiry of an existing row, keeping its pending data.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no row for `email`.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn refresh_code(
        &self,
        email: &Email,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE otp_codes
            SET code = $2, expires_at = $3, updated_at = NOW()
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Find the row matching both `email` and `code`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored data is invalid.
    pub async fn find_match(
        &self,
        email: &Email,
        code: &str,
    ) -> Result<Option<OtpRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, OtpRow>(
            r"
            SELECT id, email, code, expires_at, pending_signup
            FROM otp_codes
            WHERE email = $1 AND code = $2
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Delete one row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: OtpId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM otp_codes WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete every expired row. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

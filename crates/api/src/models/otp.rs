//! Pending signup records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exprz_core::{Email, OtpId, UserRole};

/// Account data captured at signup and held until the code is verified.
///
/// Stored as JSON text in `otp_codes.pending_signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSignup {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_admin: bool,
    pub phone: String,
}

impl PendingSignup {
    /// A regular (non-admin) signup.
    #[must_use]
    pub const fn user(username: String, password_hash: String, phone: String) -> Self {
        Self {
            username,
            password_hash,
            role: UserRole::User,
            is_admin: false,
            phone,
        }
    }
}

/// A row of `otp_codes`.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub id: OtpId,
    pub email: Email,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub pending: PendingSignup,
}

impl OtpRecord {
    /// Whether the code is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_pending_signup_json_shape() {
        let pending = PendingSignup::user(
            "vaper".to_string(),
            "$argon2id$hash".to_string(),
            "7700900123".to_string(),
        );

        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["is_admin"], false);
        assert_eq!(json["phone"], "7700900123");
    }

    #[test]
    fn test_pending_signup_defaults_role() {
        let pending: PendingSignup = serde_json::from_str(
            r#"{"username":"a","password_hash":"h","phone":"1"}"#,
        )
        .unwrap();
        assert_eq!(pending.role, UserRole::User);
        assert!(!pending.is_admin);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let record = OtpRecord {
            id: OtpId::new(1),
            email: Email::parse("a@b.co").unwrap(),
            code: "123456".to_string(),
            expires_at: now,
            pending: PendingSignup::user("a".into(), "h".into(), "1".into()),
        };

        assert!(record.is_expired_at(now));
        assert!(!record.is_expired_at(now - Duration::seconds(1)));
    }
}

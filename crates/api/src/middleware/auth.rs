//! Bearer-token extractors.
//!
//! Handlers take [`RequireAuth`] or [`RequireAdmin`] as an argument; the
//! token is read from `Authorization: Bearer <jwt>` and verified against the
//! state's [`TokenService`](crate::services::auth::TokenService).

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use exprz_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// The caller identified by a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub is_admin: bool,
}

impl AuthUser {
    /// Allow access to `owner`'s data for the owner or an admin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for anyone else.
    pub fn ensure_can_access(&self, owner: UserId) -> Result<(), AppError> {
        if self.id == owner || self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }

    /// Whether the caller may see data belonging to `owner`.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.ensure_can_access(owner).is_ok()
    }
}

/// Extractor that requires a valid session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}!", user.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub AuthUser);

/// Extractor that requires a valid token carrying the admin flag.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub AuthUser);

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Bad signature, malformed, or expired.
    InvalidToken,
    /// Valid token without the admin flag.
    NotAdmin,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "No token provided"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            Self::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    (scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty()).then(|| token.trim())
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;

        let claims = state
            .tokens()
            .verify(token)
            .map_err(|_| AuthRejection::InvalidToken)?;

        set_sentry_user(&claims.sub, None);
        tracing::Span::current().record("user_id", claims.sub.as_i32());

        Ok(Self(AuthUser {
            id: claims.sub,
            is_admin: claims.adm,
        }))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        if !user.is_admin {
            tracing::debug!(user_id = %user.id, "Non-admin rejected from admin route");
            return Err(AuthRejection::NotAdmin);
        }

        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart/1");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_access_rules() {
        let user = AuthUser {
            id: UserId::new(1),
            is_admin: false,
        };
        let admin = AuthUser {
            id: UserId::new(2),
            is_admin: true,
        };

        assert!(user.can_access(UserId::new(1)));
        assert!(!user.can_access(UserId::new(3)));
        assert!(admin.can_access(UserId::new(3)));
        assert!(matches!(
            user.ensure_can_access(UserId::new(3)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(
            AuthRejection::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::NotAdmin.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}

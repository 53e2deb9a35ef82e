//! Post-order notifications.
//!
//! Placing an order never waits on mail or WhatsApp delivery. The handler
//! spawns [`spawn_order_notifications`] and returns; failures are recorded on
//! `order_details` and picked up again by the periodic sweep started with
//! [`spawn_retry_loop`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use url::Url;

use exprz_core::UserId;

use crate::db::{OrderRepository, OtpRepository, RepositoryError, UserRepository};
use crate::models::order::{EmailDelivery, OrderDetails};
use crate::models::user::User;
use crate::services::email::{OrderSummary, PdfAttachment};
use crate::services::invoice::{InvoiceError, invoice_filename, render_invoice};
use crate::state::AppState;

/// Errors from one notification attempt.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// At least one order email is still outstanding.
    #[error("email delivery failed: {0}")]
    Delivery(String),

    #[error("invoice error: {0}")]
    Invoice(#[from] InvoiceError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// The blocking invoice task panicked or was cancelled.
    #[error("invoice task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("user {0} not found")]
    UserNotFound(UserId),
}

/// Outcome of one retry sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub delivered: usize,
    pub expired_otps: u64,
}

/// Link to an order page: `<base>/orders/<order number>`.
#[must_use]
pub fn order_link(base: &Url, order_number: &str) -> String {
    format!(
        "{}/orders/{order_number}",
        base.as_str().trim_end_matches('/')
    )
}

/// Fire-and-forget dispatch for a freshly placed order.
pub fn spawn_order_notifications(state: AppState, details: OrderDetails, customer: User) {
    tokio::spawn(async move {
        let order_number = details.order_number.clone();

        if let Err(e) = deliver_emails(&state, &details, &customer).await {
            tracing::error!(order_number = %order_number, error = %e, "Order email failed");
        }

        send_whatsapp(&state, &details, &customer).await;
    });
}

/// Send whichever order emails are still outstanding and record the result.
///
/// The customer and admin emails are attempted independently; one that
/// already went out is never sent again. The outcome is stored even when
/// sending fails, so the sweep can retry.
///
/// # Errors
///
/// Returns `NotificationError::Delivery` naming the failed recipients, or a
/// repository error if the outcome cannot be recorded.
pub async fn deliver_emails(
    state: &AppState,
    details: &OrderDetails,
    customer: &User,
) -> Result<EmailDelivery, NotificationError> {
    let (customer_result, admin_result) = if details.email.is_complete() {
        (None, None)
    } else {
        match render_attachment(state, details).await {
            Ok(pdf) => send_order_emails(state, details, customer, &pdf).await,
            Err(e) => {
                let failure = Err(format!("invoice: {e}"));
                (
                    (!details.email.customer).then(|| failure.clone()),
                    (!details.email.admin).then_some(failure),
                )
            }
        }
    };

    let (delivered, error) = settle(details.email, customer_result, admin_result);

    OrderRepository::new(state.pool())
        .mark_email_result(&details.order_number, delivered, error.as_deref())
        .await?;

    match error {
        None => {
            tracing::info!(order_number = %details.order_number, "Order emails sent");
            Ok(delivered)
        }
        Some(text) => Err(NotificationError::Delivery(text)),
    }
}

async fn render_attachment(
    state: &AppState,
    details: &OrderDetails,
) -> Result<Vec<u8>, NotificationError> {
    let details = details.clone();
    let header = state.invoice_header().clone();
    Ok(tokio::task::spawn_blocking(move || render_invoice(&details, &header)).await??)
}

/// Per-recipient send results; `None` where the email had already gone out.
type SendResults = (Option<Result<(), String>>, Option<Result<(), String>>);

async fn send_order_emails(
    state: &AppState,
    details: &OrderDetails,
    customer: &User,
    pdf: &[u8],
) -> SendResults {
    let filename = invoice_filename(&details.invoice_number);
    let attachment = PdfAttachment {
        filename: &filename,
        bytes: pdf,
    };
    let summary = OrderSummary::from(details);
    let config = state.config();

    let customer_result = if details.email.customer {
        None
    } else {
        let sent = state
            .email()
            .send_order_confirmation(
                customer.email.as_str(),
                &summary,
                &order_link(&config.frontend_url, &details.order_number),
                attachment,
            )
            .await;
        Some(sent.map_err(|e| e.to_string()))
    };

    let admin_result = if details.email.admin {
        None
    } else {
        let sent = state
            .email()
            .send_order_admin_notice(
                &summary,
                &order_link(&config.admin_url, &details.order_number),
                attachment,
            )
            .await;
        Some(sent.map_err(|e| e.to_string()))
    };

    (customer_result, admin_result)
}

/// Fold one attempt into the stored delivery state.
///
/// Returns the new state and the error text to store, `None` once nothing
/// is outstanding.
fn settle(
    previous: EmailDelivery,
    customer: Option<Result<(), String>>,
    admin: Option<Result<(), String>>,
) -> (EmailDelivery, Option<String>) {
    let mut delivered = previous;
    let mut failures = Vec::new();

    match customer {
        Some(Ok(())) => delivered.customer = true,
        Some(Err(e)) => failures.push(format!("customer: {e}")),
        None => {}
    }
    match admin {
        Some(Ok(())) => delivered.admin = true,
        Some(Err(e)) => failures.push(format!("admin: {e}")),
        None => {}
    }

    let error = (!failures.is_empty()).then(|| failures.join("; "));
    (delivered, error)
}

/// WhatsApp notices are best effort; errors are only logged.
async fn send_whatsapp(state: &AppState, details: &OrderDetails, customer: &User) {
    let Some(client) = state.whatsapp() else {
        return;
    };

    if let Err(e) = client
        .send_order_notices(details, &customer.username, &customer.phone)
        .await
    {
        tracing::warn!(
            order_number = %details.order_number,
            error = %e,
            "WhatsApp notification failed"
        );
    }
}

/// Retry undelivered order emails, then prune expired signup codes.
///
/// Only orders untouched for a full retry interval are picked up, so a
/// dispatch still in flight is left alone.
///
/// # Errors
///
/// Returns a repository error if the batch cannot be loaded. Failures of
/// individual orders are logged and counted, not returned.
pub async fn retry_failed(state: &AppState) -> Result<SweepReport, RepositoryError> {
    let settings = &state.config().notifications;
    let batch = OrderRepository::new(state.pool())
        .pending_email_retries(
            retry_cutoff(Utc::now(), settings.retry_interval),
            settings.retry_batch,
        )
        .await?;
    let users = UserRepository::new(state.pool());

    let mut report = SweepReport {
        attempted: batch.len(),
        ..SweepReport::default()
    };

    for details in &batch {
        let result = match users.get_by_id(details.user_id).await {
            Ok(Some(customer)) => deliver_emails(state, details, &customer).await.map(|_| ()),
            Ok(None) => Err(NotificationError::UserNotFound(details.user_id)),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => tracing::warn!(
                order_number = %details.order_number,
                error = %e,
                "Order email retry failed"
            ),
        }
    }

    report.expired_otps = OtpRepository::new(state.pool()).delete_expired().await?;

    Ok(report)
}

/// Orders last touched before this instant are due for a retry.
fn retry_cutoff(now: DateTime<Utc>, grace: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(grace)
        .ok()
        .and_then(|grace| now.checked_sub_signed(grace))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Run [`retry_failed`] every `retry_interval` until the runtime shuts down.
///
/// Ticks that fall behind are skipped, so sweeps never overlap.
pub fn spawn_retry_loop(state: AppState) -> JoinHandle<()> {
    let period = state.config().notifications.retry_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;

            match retry_failed(&state).await {
                Ok(report) if report.attempted > 0 || report.expired_otps > 0 => {
                    tracing::info!(
                        attempted = report.attempted,
                        delivered = report.delivered,
                        expired_otps = report.expired_otps,
                        "Notification sweep finished"
                    );
                }
                Ok(_) => tracing::debug!("Notification sweep found nothing to do"),
                Err(e) => tracing::error!(error = %e, "Notification sweep failed"),
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_link_joins_cleanly() {
        let bare = Url::parse("https://shop.exprz.test").unwrap();
        assert_eq!(
            order_link(&bare, "ORD-1-1000"),
            "https://shop.exprz.test/orders/ORD-1-1000"
        );

        let nested = Url::parse("https://exprz.test/admin/").unwrap();
        assert_eq!(
            order_link(&nested, "ORD-1-1000"),
            "https://exprz.test/admin/orders/ORD-1-1000"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = NotificationError::UserNotFound(UserId::new(4));
        assert_eq!(err.to_string(), "user 4 not found");
    }

    #[test]
    fn test_settle_tracks_recipients_independently() {
        let (delivered, error) = settle(
            EmailDelivery::default(),
            Some(Err("SMTP error: timeout".to_string())),
            Some(Ok(())),
        );

        assert_eq!(
            delivered,
            EmailDelivery {
                customer: false,
                admin: true
            }
        );
        assert_eq!(error.as_deref(), Some("customer: SMTP error: timeout"));
    }

    #[test]
    fn test_settle_retry_only_touches_outstanding_email() {
        let previous = EmailDelivery {
            customer: true,
            admin: false,
        };

        let (delivered, error) = settle(previous, None, Some(Ok(())));
        assert!(delivered.is_complete());
        assert_eq!(error, None);

        let (delivered, error) = settle(previous, None, Some(Err("refused".to_string())));
        assert!(delivered.customer);
        assert!(!delivered.admin);
        assert_eq!(error.as_deref(), Some("admin: refused"));
    }

    #[test]
    fn test_settle_joins_both_failures() {
        let (delivered, error) = settle(
            EmailDelivery::default(),
            Some(Err("a".to_string())),
            Some(Err("b".to_string())),
        );
        assert_eq!(delivered, EmailDelivery::default());
        assert_eq!(error.as_deref(), Some("customer: a; admin: b"));
    }

    #[test]
    fn test_retry_cutoff_leaves_in_flight_orders_alone() {
        let now = Utc::now();
        assert_eq!(
            retry_cutoff(now, Duration::from_secs(300)),
            now - chrono::Duration::seconds(300)
        );
        assert_eq!(
            retry_cutoff(now, Duration::MAX),
            DateTime::<Utc>::MIN_UTC
        );
    }
}

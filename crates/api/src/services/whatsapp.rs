//! WhatsApp order notices through the Twilio Messages API.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument};

use exprz_core::format_money;

use crate::config::WhatsAppConfig;
use crate::models::order::OrderDetails;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

const ADMIN_PREFIX: &str = "📢 NEW ORDER ALERT";
const CUSTOMER_PREFIX: &str = "✅ Thank you for your order!";

/// Errors from the Twilio API.
#[derive(Debug, Error)]
pub enum WhatsAppError {
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(String),

    /// Response could not be parsed.
    #[error("invalid response: {0}")]
    Response(String),

    /// Twilio rejected the message.
    #[error("twilio error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
    status: Option<String>,
    /// Present on error responses.
    message: Option<String>,
    code: Option<i64>,
}

/// Twilio client bound to one sender number.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    account_sid: String,
    auth_token: SecretString,
    from: String,
    admin_to: String,
    country_code: String,
}

impl std::fmt::Debug for WhatsAppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppClient")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from", &self.from)
            .field("admin_to", &self.admin_to)
            .finish_non_exhaustive()
    }
}

impl WhatsAppClient {
    #[must_use]
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from: config.from.clone(),
            admin_to: config.admin_to.clone(),
            country_code: config.country_code.clone(),
        }
    }

    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Twilio rejects the message.
    #[instrument(skip(self, body), fields(to = %to))]
    pub async fn send(&self, to: &str, body: &str) -> Result<(), WhatsAppError> {
        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("From", self.from.as_str()), ("To", to), ("Body", body)])
            .send()
            .await
            .map_err(|e| WhatsAppError::Request(e.to_string()))?;

        let status = response.status();
        let result: MessageResponse = response
            .json()
            .await
            .map_err(|e| WhatsAppError::Response(e.to_string()))?;

        if !status.is_success() {
            error!(
                status = %status,
                code = ?result.code,
                error = ?result.message,
                "Twilio API error sending message"
            );
            return Err(WhatsAppError::Api(
                result.message.unwrap_or_else(|| format!("HTTP {status}")),
            ));
        }

        debug!(sid = ?result.sid, status = ?result.status, "WhatsApp message queued");
        Ok(())
    }

    /// Send the order summary to the admin, then to the customer.
    ///
    /// Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first send error.
    pub async fn send_order_notices(
        &self,
        details: &OrderDetails,
        placed_by: &str,
        customer_phone: &str,
    ) -> Result<(), WhatsAppError> {
        let summary = order_summary(details, placed_by);

        self.send(&self.admin_to, &format!("{ADMIN_PREFIX}\n\n{summary}"))
            .await?;

        let to = customer_address(&self.country_code, customer_phone);
        self.send(&to, &format!("{CUSTOMER_PREFIX}\n\n{summary}"))
            .await
    }
}

/// `whatsapp:<country code><digits>`. Numbers already in `+` form keep their prefix.
fn customer_address(country_code: &str, phone: &str) -> String {
    let phone: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if phone.starts_with('+') {
        format!("whatsapp:{phone}")
    } else {
        format!("whatsapp:{country_code}{phone}")
    }
}

/// Plain-text order summary shared by both recipients.
#[must_use]
pub fn order_summary(details: &OrderDetails, placed_by: &str) -> String {
    let items = details
        .items
        .iter()
        .map(|item| format!("- {} x{}", item.description(), item.quantity))
        .collect::<Vec<_>>()
        .join("\n");

    let shipping = &details.delivery_details;

    format!(
        "📦 Order Placed by {placed_by}\n\n\
         🧾 Order ID: {order_id}\n\
         💳 Payment: {payment}\n\
         🛍️ Items:\n{items}\n\n\
         💰 Subtotal: {subtotal}\n\
         🧾 VAT: {tax}\n\
         📦 Total: {total}\n\n\
         🚚 Shipping:\n{name}\n{address}\n📞 {phone}",
        order_id = details.order_number,
        payment = details.payment_method.label(),
        subtotal = format_money(details.totals.subtotal),
        tax = format_money(details.totals.tax),
        total = format_money(details.totals.total),
        name = shipping.full_name(),
        address = shipping.one_line(),
        phone = shipping.phone,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use exprz_core::{OrderStatus, OrderTotals, PaymentMethod, ProductId, UserId};
    use rust_decimal::Decimal;

    use crate::models::order::{EmailDelivery, OrderItem};
    use crate::models::order::tests::sample_address;

    fn details() -> OrderDetails {
        let items = vec![
            OrderItem {
                product_id: ProductId::new(3),
                product_name: "Elf Bar".to_string(),
                flavour: Some("Blue Razz".to_string()),
                quantity: 2,
                price: Decimal::new(500, 2),
            },
            OrderItem {
                product_id: ProductId::new(4),
                product_name: "Pod Kit".to_string(),
                flavour: None,
                quantity: 1,
                price: Decimal::new(1000, 2),
            },
        ];
        let totals = OrderTotals::compute(
            items.iter().map(|i| (i.price, i.quantity)),
            Decimal::new(20, 2),
        );

        OrderDetails {
            order_number: "ORD-1-1000".to_string(),
            invoice_number: "INV-1-1".to_string(),
            user_id: UserId::new(1),
            items,
            totals,
            payment_method: PaymentMethod::Cod,
            payment_status: false,
            delivery_details: sample_address(),
            status: OrderStatus::Pending,
            email: EmailDelivery::default(),
            email_error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_summary_layout() {
        let text = order_summary(&details(), "vaper");

        assert!(text.starts_with("📦 Order Placed by vaper\n\n🧾 Order ID: ORD-1-1000\n"));
        assert!(text.contains("💳 Payment: Cash on Delivery\n"));
        assert!(text.contains("🛍️ Items:\n- Elf Bar (Blue Razz) x2\n- Pod Kit x1\n\n"));
        assert!(text.contains("💰 Subtotal: £20.00\n🧾 VAT: £4.00\n📦 Total: £24.00\n\n"));
        assert!(text.ends_with(
            "🚚 Shipping:\nAda Lovelace\n12 Analytical Row, London, Greater London, N1 9GU\n📞 7700900123"
        ));
    }

    #[test]
    fn test_customer_address() {
        assert_eq!(customer_address("+91", "98765 43210"), "whatsapp:+919876543210");
        assert_eq!(customer_address("+44", "+447700900123"), "whatsapp:+447700900123");
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = WhatsAppClient::new(&WhatsAppConfig {
            account_sid: "AC123".to_string(),
            auth_token: SecretString::from("twilio-token"),
            from: "whatsapp:+14155238886".to_string(),
            admin_to: "whatsapp:+447700900000".to_string(),
            country_code: "+91".to_string(),
        });

        let debug = format!("{client:?}");
        assert!(!debug.contains("twilio-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}

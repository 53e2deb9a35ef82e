//! Email service for signup codes and order notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use exprz_core::format_money;

use crate::config::EmailConfig;
use crate::models::order::OrderDetails;

const SHOP_NAME: &str = "Exprz Ecommerce";

/// HTML template for the signup code email.
#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpEmailHtml<'a> {
    code: &'a str,
    minutes: u64,
    shop: &'a str,
}

/// Plain text template for the signup code email.
#[derive(Template)]
#[template(path = "email/otp.txt")]
struct OtpEmailText<'a> {
    code: &'a str,
    minutes: u64,
    shop: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_customer.html")]
struct CustomerOrderHtml<'a> {
    order: &'a OrderSummary,
    link: &'a str,
    support_email: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/order_customer.txt")]
struct CustomerOrderText<'a> {
    order: &'a OrderSummary,
    link: &'a str,
    support_email: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/order_admin.html")]
struct AdminOrderHtml<'a> {
    order: &'a OrderSummary,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_admin.txt")]
struct AdminOrderText<'a> {
    order: &'a OrderSummary,
    link: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Attachment content type rejected.
    #[error("Invalid content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),
}

/// Pre-formatted order data shared by the order templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order_id: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub placed_on: String,
    pub payment_method: String,
    pub lines: Vec<SummaryLine>,
    pub subtotal: String,
    pub tax: String,
    pub total: String,
    pub address: String,
    pub phone: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub description: String,
    pub quantity: u32,
    pub price: String,
    pub amount: String,
}

impl From<&OrderDetails> for OrderSummary {
    fn from(details: &OrderDetails) -> Self {
        let address = &details.delivery_details;

        Self {
            order_id: details.order_number.clone(),
            invoice_number: details.invoice_number.clone(),
            customer_name: address.full_name(),
            placed_on: details.created_at.format("%d %B %Y").to_string(),
            payment_method: details.payment_method.label().to_string(),
            lines: details
                .items
                .iter()
                .map(|item| SummaryLine {
                    description: item.description(),
                    quantity: item.quantity,
                    price: format_money(item.price),
                    amount: format_money(item.line_total()),
                })
                .collect(),
            subtotal: format_money(details.totals.subtotal),
            tax: format_money(details.totals.tax),
            total: format_money(details.totals.total),
            address: address.one_line(),
            phone: address.phone.clone(),
            instructions: address.delivery_instructions.clone(),
        }
    }
}

/// A PDF attached to an outgoing email.
#[derive(Debug, Clone, Copy)]
pub struct PdfAttachment<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    from_name: String,
    admin_email: String,
    support_email: Option<String>,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("from", &self.from)
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// No connection is made until the first send.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from: config.from_address.clone(),
            from_name: config.from_name.clone(),
            admin_email: config.admin_email.clone(),
            support_email: config.support_email.clone(),
        })
    }

    /// Send a signup verification code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_otp(&self, to: &str, code: &str, minutes: u64) -> Result<(), EmailError> {
        let html = OtpEmailHtml { code, minutes, shop: SHOP_NAME }.render()?;
        let text = OtpEmailText { code, minutes, shop: SHOP_NAME }.render()?;

        let subject = format!("Your {SHOP_NAME} account OTP Verification");
        self.send(to, &subject, &text, &html, None).await
    }

    /// Send the customer's order confirmation with the invoice attached.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        order: &OrderSummary,
        link: &str,
        invoice: PdfAttachment<'_>,
    ) -> Result<(), EmailError> {
        let support_email = self.support_email.as_deref();
        let html = CustomerOrderHtml { order, link, support_email }.render()?;
        let text = CustomerOrderText { order, link, support_email }.render()?;

        let subject = format!("Your Order Confirmation #{}", order.invoice_number);
        self.send(to, &subject, &text, &html, Some(invoice)).await
    }

    /// Send the admin's new-order notice with the invoice attached.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_admin_notice(
        &self,
        order: &OrderSummary,
        link: &str,
        invoice: PdfAttachment<'_>,
    ) -> Result<(), EmailError> {
        let html = AdminOrderHtml { order, link }.render()?;
        let text = AdminOrderText { order, link }.render()?;

        let subject = format!("[ACTION REQUIRED] New Order #{}", order.invoice_number);
        self.send(&self.admin_email, &subject, &text, &html, Some(invoice))
            .await
    }

    /// Send a text + HTML email, optionally with a PDF attachment.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
        attachment: Option<PdfAttachment<'_>>,
    ) -> Result<(), EmailError> {
        let from = Mailbox::new(
            Some(self.from_name.clone()),
            self.from
                .parse()
                .map_err(|_| EmailError::InvalidAddress(self.from.clone()))?,
        );

        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text_body.to_string()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html_body.to_string()),
            );

        let body = match attachment {
            Some(pdf) => {
                let content_type = ContentType::parse("application/pdf")?;
                MultiPart::mixed().multipart(body).singlepart(
                    Attachment::new(pdf.filename.to_string()).body(pdf.bytes.to_vec(), content_type),
                )
            }
            None => body,
        };

        let email = Message::builder()
            .from(from)
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(body)?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use exprz_core::{OrderStatus, OrderTotals, PaymentMethod, ProductId, UserId};
    use rust_decimal::Decimal;

    use crate::models::order::{EmailDelivery, OrderItem};
    use crate::models::order::tests::sample_address;

    fn details() -> OrderDetails {
        let items = vec![
            OrderItem {
                product_id: ProductId::new(1),
                product_name: "Mango Ice".to_string(),
                flavour: Some("Mango".to_string()),
                quantity: 2,
                price: Decimal::new(599, 2),
            },
            OrderItem {
                product_id: ProductId::new(2),
                product_name: "Coil <Pack>".to_string(),
                flavour: None,
                quantity: 1,
                price: Decimal::new(350, 2),
            },
        ];
        let totals = OrderTotals::compute(
            items.iter().map(|i| (i.price, i.quantity)),
            Decimal::new(20, 2),
        );

        OrderDetails {
            order_number: "ORD-1700000000000-1234".to_string(),
            invoice_number: "INV-1700000000000-42".to_string(),
            user_id: UserId::new(7),
            items,
            totals,
            payment_method: PaymentMethod::Cod,
            payment_status: false,
            delivery_details: sample_address(),
            status: OrderStatus::Pending,
            email: EmailDelivery::default(),
            email_error: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_summary_formats_money_and_lines() {
        let summary = OrderSummary::from(&details());

        assert_eq!(summary.customer_name, "Ada Lovelace");
        assert_eq!(summary.payment_method, "Cash on Delivery");
        assert_eq!(summary.placed_on, "09 March 2024");
        assert_eq!(summary.lines[0].description, "Mango Ice (Mango)");
        assert_eq!(summary.lines[0].amount, "£11.98");
        assert_eq!(summary.subtotal, "£15.48");
        assert_eq!(summary.tax, "£3.10");
        assert_eq!(summary.total, "£18.58");
    }

    #[test]
    fn test_otp_templates_render_code_and_validity() {
        let html = OtpEmailHtml { code: "042917", minutes: 5, shop: SHOP_NAME }
            .render()
            .unwrap();
        let text = OtpEmailText { code: "042917", minutes: 5, shop: SHOP_NAME }
            .render()
            .unwrap();

        for body in [&html, &text] {
            assert!(body.contains("042917"));
            assert!(body.contains("5 minutes"));
            assert!(body.contains("The Exprz Ecommerce Team"));
        }
    }

    #[test]
    fn test_customer_template_escapes_html_and_links_order() {
        let summary = OrderSummary::from(&details());
        let link = "http://localhost:5173/orders/ORD-1700000000000-1234";

        let html = CustomerOrderHtml { order: &summary, link, support_email: Some("help@exprz.test") }
            .render()
            .unwrap();
        assert!(html.contains("Coil &#60;Pack&#62;") || html.contains("Coil &lt;Pack&gt;"));
        assert!(html.contains(link));
        assert!(html.contains("help@exprz.test"));

        let text = CustomerOrderText { order: &summary, link, support_email: None }
            .render()
            .unwrap();
        assert!(text.contains("Coil <Pack> x1"));
        assert!(text.contains("Total: £18.58"));
    }

    #[test]
    fn test_admin_template_names_customer() {
        let summary = OrderSummary::from(&details());
        let link = "http://localhost:5174/orders/ORD-1700000000000-1234";

        let text = AdminOrderText { order: &summary, link }.render().unwrap();
        assert!(text.contains("Ada Lovelace"));
        assert!(text.contains("£18.58"));
        assert!(text.contains("Cash on Delivery"));
        assert!(text.contains(link));
    }

    #[tokio::test]
    async fn test_service_builds_without_connecting() {
        let config = crate::config::test_support::config();
        assert!(EmailService::new(&config.email).is_ok());
    }
}

//! Order snapshots and the COD checkout payload.
//!
//! Order payloads use camelCase on the wire, matching the shop frontend.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use exprz_core::{OrderId, OrderStatus, OrderTotals, PaymentMethod, ProductId, UserId};

/// One purchased line, frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub flavour: Option<String>,
    pub quantity: u32,
    /// Unit price when the order was placed.
    pub price: Decimal,
}

impl OrderItem {
    /// `name (flavour)`, or just the name.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.flavour {
            Some(flavour) => format!("{} ({flavour})", self.product_name),
            None => self.product_name.clone(),
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        exprz_core::line_total(self.price, self.quantity)
    }
}

/// Delivery address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub street_address: String,
    pub city: String,
    #[serde(default)]
    pub county: String,
    pub postcode: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_instructions: Option<String>,
}

impl ShippingAddress {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Street, city, county and postcode on one line, skipping blanks.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.street_address.as_str(),
            self.city.as_str(),
            self.county.as_str(),
            self.postcode.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub payment_status: bool,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice and notification state for an order.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order_number: String,
    pub invoice_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub payment_status: bool,
    pub delivery_details: ShippingAddress,
    pub status: OrderStatus,
    pub email: EmailDelivery,
    pub email_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `email_error` value of an order whose first delivery attempt has not
/// finished yet.
pub const EMAIL_PENDING: &str = "pending";

/// Which order emails have gone out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmailDelivery {
    pub customer: bool,
    pub admin: bool,
}

impl EmailDelivery {
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.customer && self.admin
    }
}

/// Everything the repository needs to write a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub invoice_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping_address: ShippingAddress,
}

/// Order as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: String,
    pub invoice_number: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: bool,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
}

impl OrderView {
    #[must_use]
    pub fn new(order: Order, invoice_number: Option<String>) -> Self {
        Self {
            order_id: order.order_number,
            invoice_number,
            user_id: order.user_id,
            created_at: order.created_at,
            items: order.items,
            subtotal: order.totals.subtotal,
            tax: order.totals.tax,
            total_amount: order.totals.total,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            status: order.status,
            shipping_address: order.shipping_address,
        }
    }
}

/// `ORD-<unix millis>-<4 digits>`.
pub fn generate_order_number(now: DateTime<Utc>, rng: &mut impl Rng) -> String {
    format!(
        "ORD-{}-{}",
        now.timestamp_millis(),
        rng.random_range(1000..10_000)
    )
}

/// `INV-<unix millis>-<0..999>`.
pub fn generate_invoice_number(now: DateTime<Utc>, rng: &mut impl Rng) -> String {
    format!("INV-{}-{}", now.timestamp_millis(), rng.random_range(0..1000))
}

// =============================================================================
// Checkout payload
// =============================================================================

/// Body of `POST /api/orders/cod`.
///
/// Client-side totals and user ids are ignored; both come from the server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Option<Vec<OrderItemInput>>,
    pub shipping_address: Option<ShippingAddressInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[serde(alias = "product_id", alias = "productid")]
    pub product_id: Option<ProductId>,
    pub flavour: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub postcode: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub delivery_instructions: Option<String>,
}

/// A validated checkout line, before product lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub flavour: Option<String>,
    pub quantity: u32,
}

/// Raised when the checkout body lacks items or address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields")]
pub struct MissingOrderFields;

impl CreateOrderRequest {
    /// Validate items and address.
    ///
    /// # Errors
    ///
    /// Returns `MissingOrderFields` if there are no items, any item lacks a
    /// product or a positive quantity, or a required address field is blank.
    pub fn validate(self) -> Result<(Vec<RequestedItem>, ShippingAddress), MissingOrderFields> {
        let items = self.items.filter(|items| !items.is_empty()).ok_or(MissingOrderFields)?;
        let address = self.shipping_address.ok_or(MissingOrderFields)?;

        let items = items
            .into_iter()
            .map(|item| {
                let product_id = item.product_id.ok_or(MissingOrderFields)?;
                let quantity = item
                    .quantity
                    .filter(|q| *q >= 1)
                    .and_then(|q| u32::try_from(q).ok())
                    .ok_or(MissingOrderFields)?;
                Ok(RequestedItem {
                    product_id,
                    flavour: super::non_blank(item.flavour.as_deref()),
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, address.validate()?))
    }
}

impl ShippingAddressInput {
    fn validate(self) -> Result<ShippingAddress, MissingOrderFields> {
        let required = |v: Option<String>| super::non_blank(v.as_deref()).ok_or(MissingOrderFields);

        Ok(ShippingAddress {
            first_name: required(self.first_name)?,
            last_name: required(self.last_name)?,
            street_address: required(self.street_address)?,
            city: required(self.city)?,
            county: super::non_blank(self.county.as_deref()).unwrap_or_default(),
            postcode: required(self.postcode)?,
            phone: required(self.phone)?,
            email: super::non_blank(self.email.as_deref()),
            delivery_instructions: super::non_blank(self.delivery_instructions.as_deref()),
        })
    }
}

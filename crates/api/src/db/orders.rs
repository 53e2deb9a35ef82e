//! Order repository: `orders` snapshots plus their `order_details`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use exprz_core::{OrderId, OrderStatus, OrderTotals, PaymentMethod, UserId};

use super::RepositoryError;
use crate::models::order::{
    EMAIL_PENDING, EmailDelivery, NewOrder, Order, OrderDetails, OrderItem, ShippingAddress,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, items, subtotal, tax, total_amount, \
     payment_method, payment_status, status, shipping_address, created_at, updated_at";

const DETAILS_COLUMNS: &str = "order_number, invoice_number, user_id, items, subtotal, tax, \
     total_amount, payment_method, payment_status, delivery_details, status, \
     customer_email_sent, admin_email_sent, email_error, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    subtotal: Decimal,
    tax: Decimal,
    total_amount: Decimal,
    payment_method: PaymentMethod,
    payment_status: bool,
    status: OrderStatus,
    shipping_address: Json<ShippingAddress>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            items: row.items.0,
            totals: OrderTotals {
                subtotal: row.subtotal,
                tax: row.tax,
                total: row.total_amount,
            },
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            status: row.status,
            shipping_address: row.shipping_address.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DetailsRow {
    order_number: String,
    invoice_number: String,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    subtotal: Decimal,
    tax: Decimal,
    total_amount: Decimal,
    payment_method: PaymentMethod,
    payment_status: bool,
    delivery_details: Json<ShippingAddress>,
    status: OrderStatus,
    customer_email_sent: bool,
    admin_email_sent: bool,
    email_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<DetailsRow> for OrderDetails {
    fn from(row: DetailsRow) -> Self {
        Self {
            order_number: row.order_number,
            invoice_number: row.invoice_number,
            user_id: row.user_id,
            items: row.items.0,
            totals: OrderTotals {
                subtotal: row.subtotal,
                tax: row.tax,
                total: row.total_amount,
            },
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            delivery_details: row.delivery_details.0,
            status: row.status,
            email: EmailDelivery {
                customer: row.customer_email_sent,
                admin: row.admin_email_sent,
            },
            email_error: row.email_error,
            created_at: row.created_at,
        }
    }
}

/// Repository for `orders` and `order_details`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write a cash-on-delivery order and its details, then empty the
    /// user's cart. All three writes share one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on an order or invoice number collision.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        new: &NewOrder,
    ) -> Result<(Order, OrderDetails), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (order_number, user_id, items, subtotal, tax, total_amount,
                                payment_method, payment_status, status, shipping_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&new.order_number)
        .bind(new.user_id)
        .bind(Json(&new.items))
        .bind(new.totals.subtotal)
        .bind(new.totals.tax)
        .bind(new.totals.total)
        .bind(PaymentMethod::Cod)
        .bind(OrderStatus::Pending)
        .bind(Json(&new.shipping_address))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "order number already exists"))?;

        let details = sqlx::query_as::<_, DetailsRow>(&format!(
            r"
            INSERT INTO order_details (order_number, invoice_number, user_id, items, subtotal,
                                       tax, total_amount, payment_method, payment_status,
                                       delivery_details, status, email_sent, email_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9, $10, FALSE, $11)
            RETURNING {DETAILS_COLUMNS}
            "
        ))
        .bind(&new.order_number)
        .bind(&new.invoice_number)
        .bind(new.user_id)
        .bind(Json(&new.items))
        .bind(new.totals.subtotal)
        .bind(new.totals.tax)
        .bind(new.totals.total)
        .bind(PaymentMethod::Cod)
        .bind(Json(&new.shipping_address))
        .bind(OrderStatus::Pending)
        .bind(EMAIL_PENDING)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "invoice number already exists"))?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((order.into(), details.into()))
    }

    /// Get an order by its public number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Get the details row of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_details(
        &self,
        order_number: &str,
    ) -> Result<Option<OrderDetails>, RepositoryError> {
        let row = sqlx::query_as::<_, DetailsRow>(&format!(
            "SELECT {DETAILS_COLUMNS} FROM order_details WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(OrderDetails::from))
    }

    /// Record the outcome of an email attempt.
    ///
    /// `email_sent` follows `delivered`; `error` replaces the stored text,
    /// and `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_email_result(
        &self,
        order_number: &str,
        delivered: EmailDelivery,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE order_details
            SET customer_email_sent = $2,
                admin_email_sent = $3,
                email_sent = $4,
                email_error = $5,
                updated_at = NOW()
            WHERE order_number = $1
            ",
        )
        .bind(order_number)
        .bind(delivered.customer)
        .bind(delivered.admin)
        .bind(delivered.is_complete())
        .bind(error)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Oldest undelivered orders untouched since `before`, up to `limit`.
    ///
    /// Covers failed attempts and orders whose first attempt never
    /// finished (still [`EMAIL_PENDING`]). The cutoff keeps the sweep away
    /// from orders a dispatch task is still working on.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_email_retries(
        &self,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderDetails>, RepositoryError> {
        let rows = sqlx::query_as::<_, DetailsRow>(&format!(
            r"
            SELECT {DETAILS_COLUMNS}
            FROM order_details
            WHERE email_sent = FALSE AND email_error IS NOT NULL AND updated_at < $1
            ORDER BY id ASC
            LIMIT $2
            "
        ))
        .bind(before)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderDetails::from).collect())
    }
}

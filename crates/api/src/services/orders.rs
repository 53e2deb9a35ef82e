//! Cash-on-delivery order placement.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use exprz_core::{OrderTotals, ProductId, UserId};

use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::order::{
    CreateOrderRequest, MissingOrderFields, NewOrder, Order, OrderDetails, OrderItem,
    RequestedItem, generate_invoice_number, generate_order_number,
};
use crate::models::product::Product;

/// Attempts before giving up on order/invoice number collisions.
const NUMBER_ATTEMPTS: usize = 3;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Invalid(#[from] MissingOrderFields),

    /// A requested product does not exist or is inactive.
    #[error("Product {0} is not available")]
    ProductUnavailable(ProductId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Places orders for one user.
pub struct OrderService<'a> {
    products: ProductRepository<'a>,
    orders: OrderRepository<'a>,
    tax_rate: Decimal,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, tax_rate: Decimal) -> Self {
        Self {
            products: ProductRepository::new(pool),
            orders: OrderRepository::new(pool),
            tax_rate,
        }
    }

    /// Validate, price and store a COD order, clearing the user's cart.
    ///
    /// Prices come from the catalog at the time of the call; any client
    /// supplied totals are ignored.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Invalid` for a malformed body.
    /// Returns `OrderError::ProductUnavailable` for unknown or inactive products.
    /// Returns `OrderError::Repository` if the write fails.
    pub async fn place_cod_order(
        &self,
        user_id: UserId,
        request: CreateOrderRequest,
    ) -> Result<(Order, OrderDetails), OrderError> {
        let (requested, shipping_address) = request.validate()?;

        let ids: Vec<ProductId> = requested.iter().map(|item| item.product_id).collect();
        let catalog: HashMap<ProductId, Product> = self
            .products
            .get_many(&ids, true)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = snapshot_items(&requested, &catalog)?;
        let totals = OrderTotals::compute(
            items.iter().map(|item| (item.price, item.quantity)),
            self.tax_rate,
        );

        let mut attempt = 1;
        loop {
            // ThreadRng is !Send; drop it before the insert is awaited.
            let (order_number, invoice_number) = {
                let now = Utc::now();
                let mut rng = rand::rng();
                (
                    generate_order_number(now, &mut rng),
                    generate_invoice_number(now, &mut rng),
                )
            };
            let new_order = NewOrder {
                order_number,
                invoice_number,
                user_id,
                items: items.clone(),
                totals,
                shipping_address: shipping_address.clone(),
            };

            match self.orders.create(&new_order).await {
                Ok(placed) => {
                    tracing::info!(
                        order_number = %placed.0.order_number,
                        user_id = %user_id,
                        total = %totals.total,
                        "COD order placed"
                    );
                    return Ok(placed);
                }
                Err(RepositoryError::Conflict(reason)) if attempt < NUMBER_ATTEMPTS => {
                    tracing::warn!(attempt, reason = %reason, "Order number collision, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Freeze name and current price for each requested line.
fn snapshot_items(
    requested: &[RequestedItem],
    catalog: &HashMap<ProductId, Product>,
) -> Result<Vec<OrderItem>, OrderError> {
    requested
        .iter()
        .map(|item| {
            let product = catalog
                .get(&item.product_id)
                .ok_or(OrderError::ProductUnavailable(item.product_id))?;
            Ok(OrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                flavour: item.flavour.clone(),
                quantity: item.quantity,
                price: product.price,
            })
        })
        .collect()
}

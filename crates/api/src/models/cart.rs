//! Cart lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exprz_core::{CartItemId, ProductId, UserId};

use super::product::ProductView;

/// One cart line. Lines are unique per (user, product, flavour).
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub flavour: Option<String>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line with its product embedded.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: ProductView,
}

/// Body of `POST /api/cart`.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    #[serde(alias = "productid", alias = "productId")]
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
    pub flavour: Option<String>,
}

/// Body of `PUT /api/cart/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: Option<i64>,
}

/// Validate a requested quantity (>= 1, fits a database integer).
#[must_use]
pub fn valid_quantity(quantity: Option<i64>) -> Option<i32> {
    quantity
        .filter(|q| *q >= 1)
        .and_then(|q| i32::try_from(q).ok())
}

/// Normalize a flavour label: trimmed, blank means "no flavour".
#[must_use]
pub fn normalize_flavour(flavour: Option<String>) -> Option<String> {
    super::non_blank(flavour.as_deref())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_request_accepts_both_spellings() {
        let a: AddToCartRequest = serde_json::from_value(json!({"productid": 4})).unwrap();
        let b: AddToCartRequest = serde_json::from_value(json!({"product_id": 4})).unwrap();
        assert_eq!(a.product_id, Some(ProductId::new(4)));
        assert_eq!(b.product_id, Some(ProductId::new(4)));
        assert_eq!(a.quantity, None);
    }

    #[test]
    fn test_valid_quantity() {
        assert_eq!(valid_quantity(Some(3)), Some(3));
        assert_eq!(valid_quantity(Some(0)), None);
        assert_eq!(valid_quantity(Some(-2)), None);
        assert_eq!(valid_quantity(None), None);
        assert_eq!(valid_quantity(Some(i64::MAX)), None);
    }

    #[test]
    fn test_normalize_flavour() {
        assert_eq!(normalize_flavour(Some("  ".into())), None);
        assert_eq!(normalize_flavour(Some(" Cola ".into())).as_deref(), Some("Cola"));
        assert_eq!(normalize_flavour(None), None);
    }
}

//! Product domain types and payloads.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use exprz_core::{NicotineLevel, ProductId, format_amount, format_money};

use super::present;

/// A catalog product as stored.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    /// Raw JSON text; see [`parse_flavors`].
    pub flavors_data: Option<String>,
    pub nicotine_level: Option<NicotineLevel>,
    pub description: Option<String>,
    pub image_base64: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub product_group: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parse stored flavor data into a list.
///
/// Accepts a JSON array, or an object holding a `flavours` (or `flavors`)
/// array. Anything else yields an empty list; malformed JSON is logged.
#[must_use]
pub fn parse_flavors(raw: Option<&str>, product_id: ProductId) -> Vec<Value> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut map)) => match map
            .remove("flavours")
            .or_else(|| map.remove("flavors"))
        {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!(product_id = %product_id, error = %e, "Invalid flavors_data JSON");
            Vec::new()
        }
    }
}

/// Product as returned to clients. Never exposes the raw `flavors_data`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub flavors: Vec<Value>,
    pub nicotine_level: Option<NicotineLevel>,
    pub description: Option<String>,
    pub image_base64: Option<String>,
    /// Two-decimal string, e.g. `"12.50"`.
    pub price: String,
    pub formatted_price: String,
    pub stock: i32,
    pub in_stock: bool,
    pub category: Option<String>,
    pub product_group: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductView {
    fn from(p: Product) -> Self {
        let flavors = parse_flavors(p.flavors_data.as_deref(), p.id);

        Self {
            id: p.id,
            name: p.name,
            brand: p.brand,
            flavors,
            nicotine_level: p.nicotine_level,
            description: p.description,
            image_base64: p.image_base64,
            price: format_amount(p.price),
            formatted_price: format_money(p.price),
            stock: p.stock,
            in_stock: p.stock > 0,
            category: p.category,
            product_group: p.product_group,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Body of the admin product create/update routes.
///
/// Every field is optional at the wire level so that validation can answer
/// with the shop's own messages instead of a deserializer error.
#[derive(Debug, Default, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub brand: Option<String>,
    /// Number or numeric string.
    pub price: Option<Value>,
    pub stock: Option<Value>,
    #[serde(default, deserialize_with = "present", alias = "flavors")]
    pub flavors_data: Option<Option<Value>>,
    #[serde(default, deserialize_with = "present")]
    pub nicotine_level: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_base64: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub product_group: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Validated fields for an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: String,
    pub brand: String,
    pub price: Decimal,
    pub stock: i32,
    pub flavors_data: Option<String>,
    pub nicotine_level: Option<NicotineLevel>,
    pub description: Option<String>,
    pub image_base64: Option<String>,
    pub category: Option<String>,
    pub product_group: Option<String>,
    pub is_active: bool,
}

/// Largest price a `NUMERIC(10,2)` column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Product validation failures, rendered as 400 responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductValidationError {
    #[error("Name, brand, and price are required fields")]
    MissingRequired,
    #[error("Price must be a non-negative number")]
    InvalidPrice,
    #[error("Price must not exceed 99999999.99")]
    PriceTooLarge,
    #[error("Stock must be a non-negative integer")]
    InvalidStock,
    #[error("Nicotine level must be '10 mg', '20 mg' or null")]
    InvalidNicotineLevel,
}

impl ProductInput {
    /// Validate for a new product. Absent optional fields get defaults.
    ///
    /// # Errors
    ///
    /// Returns the first failed rule.
    pub fn into_new(self) -> Result<ProductChanges, ProductValidationError> {
        let (name, brand, price) = self.required()?;
        let stock = parse_stock(self.stock.as_ref())?.unwrap_or(0);

        Ok(ProductChanges {
            name,
            brand,
            price,
            stock,
            flavors_data: match self.flavors_data {
                Some(value) => flavors_to_text(value),
                None => Some("[]".to_string()),
            },
            nicotine_level: parse_nicotine(self.nicotine_level.flatten())?,
            description: self.description.flatten(),
            image_base64: self.image_base64.flatten(),
            category: self.category.flatten(),
            product_group: self.product_group.flatten(),
            is_active: self.is_active.unwrap_or(true),
        })
    }

    /// Validate an update. Absent optional fields keep the stored value.
    ///
    /// # Errors
    ///
    /// Returns the first failed rule.
    pub fn into_update(self, current: &Product) -> Result<ProductChanges, ProductValidationError> {
        let (name, brand, price) = self.required()?;
        let stock = parse_stock(self.stock.as_ref())?.unwrap_or(current.stock);

        let nicotine_level = match self.nicotine_level {
            Some(level) => parse_nicotine(level)?,
            None => current.nicotine_level,
        };

        Ok(ProductChanges {
            name,
            brand,
            price,
            stock,
            flavors_data: self
                .flavors_data
                .map_or_else(|| current.flavors_data.clone(), flavors_to_text),
            nicotine_level,
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            image_base64: self
                .image_base64
                .unwrap_or_else(|| current.image_base64.clone()),
            category: self.category.unwrap_or_else(|| current.category.clone()),
            product_group: self
                .product_group
                .unwrap_or_else(|| current.product_group.clone()),
            is_active: self.is_active.unwrap_or(current.is_active),
        })
    }

    fn required(&self) -> Result<(String, String, Decimal), ProductValidationError> {
        let name = super::non_blank(self.name.as_deref());
        let brand = super::non_blank(self.brand.as_deref());
        let (Some(name), Some(brand), Some(price)) = (name, brand, self.price.as_ref()) else {
            return Err(ProductValidationError::MissingRequired);
        };
        if price.is_null() {
            return Err(ProductValidationError::MissingRequired);
        }

        let price = parse_price(price).ok_or(ProductValidationError::InvalidPrice)?;
        if price > MAX_PRICE {
            return Err(ProductValidationError::PriceTooLarge);
        }
        Ok((name, brand, price))
    }
}

/// Parse a non-negative price from a JSON number or numeric string.
#[must_use]
pub fn parse_price(value: &Value) -> Option<Decimal> {
    let price = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok()?,
        Value::String(s) => Decimal::from_str(s.trim()).ok()?,
        _ => return None,
    };

    (!price.is_sign_negative() || price.is_zero()).then(|| price.round_dp(2))
}

fn parse_stock(value: Option<&Value>) -> Result<Option<i32>, ProductValidationError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    parsed
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n >= 0)
        .map(Some)
        .ok_or(ProductValidationError::InvalidStock)
}

fn parse_nicotine(value: Option<String>) -> Result<Option<NicotineLevel>, ProductValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| ProductValidationError::InvalidNicotineLevel),
    }
}

/// Strings are stored verbatim; other JSON values are serialized.
fn flavors_to_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Body of the `PATCH .../status` routes.
#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub is_active: Option<Value>,
}

impl StatusInput {
    /// The requested flag, if it is a JSON boolean.
    #[must_use]
    pub fn flag(&self) -> Option<bool> {
        self.is_active.as_ref().and_then(Value::as_bool)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(flavors_data: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Mango Ice".to_string(),
            brand: "Elf".to_string(),
            flavors_data: flavors_data.map(str::to_owned),
            nicotine_level: Some(NicotineLevel::Mg20),
            description: Some("Cold mango".to_string()),
            image_base64: None,
            price: Decimal::new(599, 2),
            stock: 0,
            category: Some("Disposables".to_string()),
            product_group: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_flavors_array() {
        let flavors = parse_flavors(Some(r#"["Mango","Lime"]"#), ProductId::new(1));
        assert_eq!(flavors, vec![json!("Mango"), json!("Lime")]);
    }

    #[test]
    fn test_parse_flavors_wrapped_object() {
        let british = parse_flavors(Some(r#"{"flavours":[{"flr":"Cola"}]}"#), ProductId::new(1));
        assert_eq!(british, vec![json!({"flr": "Cola"})]);

        let american = parse_flavors(Some(r#"{"flavors":["Grape"]}"#), ProductId::new(1));
        assert_eq!(american, vec![json!("Grape")]);
    }

    #[test]
    fn test_parse_flavors_fallbacks() {
        assert!(parse_flavors(None, ProductId::new(1)).is_empty());
        assert!(parse_flavors(Some("   "), ProductId::new(1)).is_empty());
        assert!(parse_flavors(Some("not json"), ProductId::new(1)).is_empty());
        assert!(parse_flavors(Some(r#""Mango""#), ProductId::new(1)).is_empty());
        assert!(parse_flavors(Some(r#"{"flavours":"Mango"}"#), ProductId::new(1)).is_empty());
    }

    #[test]
    fn test_view_shapes_price_and_stock() {
        let view = ProductView::from(product(Some(r#"["Mango"]"#)));
        assert_eq!(view.price, "5.99");
        assert_eq!(view.formatted_price, "£5.99");
        assert!(!view.in_stock);
        assert_eq!(view.flavors.len(), 1);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("flavors_data").is_none());
        assert_eq!(json["nicotine_level"], "20 mg");
    }

    #[test]
    fn test_into_new_requires_name_brand_price() {
        let input: ProductInput = serde_json::from_value(json!({"name": "X", "brand": "  "})).unwrap();
        assert_eq!(
            input.into_new().unwrap_err(),
            ProductValidationError::MissingRequired
        );

        let input: ProductInput =
            serde_json::from_value(json!({"name": "X", "brand": "Y", "price": null})).unwrap();
        assert_eq!(
            input.into_new().unwrap_err(),
            ProductValidationError::MissingRequired
        );
    }

    #[test]
    fn test_into_new_defaults() {
        let input: ProductInput =
            serde_json::from_value(json!({"name": " X ", "brand": "Y", "price": "4.5"})).unwrap();
        let changes = input.into_new().unwrap();

        assert_eq!(changes.name, "X");
        assert_eq!(changes.price, Decimal::new(450, 2));
        assert_eq!(changes.stock, 0);
        assert_eq!(changes.flavors_data.as_deref(), Some("[]"));
        assert_eq!(changes.nicotine_level, None);
    }

    #[test]
    fn test_into_new_rejects_negative_values() {
        let input: ProductInput =
            serde_json::from_value(json!({"name": "X", "brand": "Y", "price": -1})).unwrap();
        assert_eq!(input.into_new().unwrap_err(), ProductValidationError::InvalidPrice);

        let input: ProductInput = serde_json::from_value(
            json!({"name": "X", "brand": "Y", "price": 1, "stock": -3}),
        )
        .unwrap();
        assert_eq!(input.into_new().unwrap_err(), ProductValidationError::InvalidStock);
    }

    #[test]
    fn test_into_new_rejects_unknown_nicotine_level() {
        let input: ProductInput = serde_json::from_value(
            json!({"name": "X", "brand": "Y", "price": 1, "nicotine_level": "50 mg"}),
        )
        .unwrap();
        assert_eq!(
            input.into_new().unwrap_err(),
            ProductValidationError::InvalidNicotineLevel
        );
    }

    #[test]
    fn test_flavors_data_string_stored_verbatim() {
        let input: ProductInput = serde_json::from_value(json!({
            "name": "X", "brand": "Y", "price": 1,
            "flavors_data": "{\"flavours\":[\"Cola\"]}"
        }))
        .unwrap();
        assert_eq!(
            input.into_new().unwrap().flavors_data.as_deref(),
            Some("{\"flavours\":[\"Cola\"]}")
        );

        let input: ProductInput = serde_json::from_value(json!({
            "name": "X", "brand": "Y", "price": 1, "flavors_data": ["Cola", "Lime"]
        }))
        .unwrap();
        assert_eq!(
            input.into_new().unwrap().flavors_data.as_deref(),
            Some(r#"["Cola","Lime"]"#)
        );
    }

    #[test]
    fn test_into_update_keeps_absent_fields() {
        let current = product(Some(r#"["Mango"]"#));
        let input: ProductInput = serde_json::from_value(json!({
            "name": "Mango Ice 2", "brand": "Elf", "price": 6, "description": null
        }))
        .unwrap();

        let changes = input.into_update(&current).unwrap();
        assert_eq!(changes.name, "Mango Ice 2");
        assert_eq!(changes.stock, current.stock);
        assert_eq!(changes.flavors_data, current.flavors_data);
        assert_eq!(changes.nicotine_level, Some(NicotineLevel::Mg20));
        assert_eq!(changes.category.as_deref(), Some("Disposables"));
        // explicit null clears
        assert_eq!(changes.description, None);
    }

    #[test]
    fn test_status_input_flag() {
        let input: StatusInput = serde_json::from_value(json!({"is_active": false})).unwrap();
        assert_eq!(input.flag(), Some(false));

        let input: StatusInput = serde_json::from_value(json!({"is_active": "yes"})).unwrap();
        assert_eq!(input.flag(), None);

        let input: StatusInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(input.flag(), None);
    }

    #[test]
    fn test_parse_price_forms() {
        assert_eq!(parse_price(&json!(12)), Some(Decimal::new(12, 0)));
        assert_eq!(parse_price(&json!(12.5)), Some(Decimal::new(125, 1)));
        assert_eq!(parse_price(&json!("0")), Some(Decimal::ZERO));
        assert_eq!(parse_price(&json!("abc")), None);
        assert_eq!(parse_price(&json!(true)), None);
    }

    #[test]
    fn test_price_above_column_range_is_rejected() {
        assert_eq!(MAX_PRICE.to_string(), "99999999.99");

        let input: ProductInput = serde_json::from_value(
            json!({"name": "X", "brand": "Y", "price": "99999999.99"}),
        )
        .unwrap();
        assert_eq!(input.into_new().unwrap().price, MAX_PRICE);

        let input: ProductInput =
            serde_json::from_value(json!({"name": "X", "brand": "Y", "price": 100_000_000}))
                .unwrap();
        assert_eq!(
            input.into_new().unwrap_err(),
            ProductValidationError::PriceTooLarge
        );
    }

    #[test]
    fn test_is_active_defaults_and_updates() {
        let input: ProductInput =
            serde_json::from_value(json!({"name": "X", "brand": "Y", "price": 1})).unwrap();
        assert!(input.into_new().unwrap().is_active);

        let mut current = product(None);
        current.is_active = false;
        let input: ProductInput =
            serde_json::from_value(json!({"name": "X", "brand": "Y", "price": 1})).unwrap();
        assert!(!input.into_update(&current).unwrap().is_active);

        let input: ProductInput = serde_json::from_value(
            json!({"name": "X", "brand": "Y", "price": 1, "is_active": true}),
        )
        .unwrap();
        assert!(input.into_update(&current).unwrap().is_active);
    }
}

//! Seed the catalog from a YAML file.
//!
//! The file uses the same field names as the admin JSON API:
//!
//! ```yaml
//! categories:
//!   - name: Disposables
//!     description: Single-use devices
//! products:
//!   - name: Elf Bar 600
//!     brand: Elf Bar
//!     price: "5.99"
//!     stock: 40
//!     flavors: [Mango, Blue Razz]
//!     nicotine_level: 20 mg
//!     category: Disposables
//! ```
//!
//! Every entry is validated before the database is touched. Categories are
//! upserted by name; products are always inserted.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use exprz_api::db::{CategoryRepository, ProductRepository};
use exprz_api::models::category::{CategoryChanges, CategoryInput};
use exprz_api::models::product::{ProductChanges, ProductInput};

/// Top-level shape of a catalog seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub categories: Vec<CategoryInput>,
    pub products: Vec<ProductInput>,
}

/// A seed file that passed validation.
#[derive(Debug)]
pub struct ValidatedCatalog {
    pub categories: Vec<CategoryChanges>,
    pub products: Vec<ProductChanges>,
}

/// Validate every entry, collecting all failures.
///
/// # Errors
///
/// Returns one message per invalid entry, prefixed with its position.
pub fn validate_catalog(seed: CatalogSeed) -> Result<ValidatedCatalog, Vec<String>> {
    let mut errors = Vec::new();

    let categories = seed
        .categories
        .into_iter()
        .enumerate()
        .filter_map(|(i, input)| {
            input
                .into_new()
                .map_err(|e| errors.push(format!("categories[{i}]: {e}")))
                .ok()
        })
        .collect();

    let products = seed
        .products
        .into_iter()
        .enumerate()
        .filter_map(|(i, input)| {
            input
                .into_new()
                .map_err(|e| errors.push(format!("products[{i}]: {e}")))
                .ok()
        })
        .collect();

    if errors.is_empty() {
        Ok(ValidatedCatalog {
            categories,
            products,
        })
    } else {
        Err(errors)
    }
}

/// Seed categories and products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a database write fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        "Parsed catalog"
    );

    let catalog = match validate_catalog(seed) {
        Ok(catalog) => catalog,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    let pool = super::connect().await?;
    info!("Connected to database");

    let categories = CategoryRepository::new(&pool);
    for changes in &catalog.categories {
        let category = categories.upsert_by_name(changes).await?;
        info!(id = %category.id, name = %category.name, "Category upserted");
    }

    let products = ProductRepository::new(&pool);
    for changes in &catalog.products {
        let product = products.create(changes).await?;
        info!(id = %product.id, name = %product.name, "Product created");
    }

    info!(
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        "Catalog seeded"
    );
    Ok(())
}

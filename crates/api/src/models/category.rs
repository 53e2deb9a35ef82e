//! Category domain types and payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exprz_core::CategoryId;

use super::present;

/// A product category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the admin category create/update routes.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Validated category fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Raised when `name` is missing or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Name is a required field")]
pub struct MissingCategoryName;

impl CategoryInput {
    /// Validate for a new category, active unless stated otherwise.
    ///
    /// # Errors
    ///
    /// Returns `MissingCategoryName` if the name is blank.
    pub fn into_new(self) -> Result<CategoryChanges, MissingCategoryName> {
        let name = super::non_blank(self.name.as_deref()).ok_or(MissingCategoryName)?;

        Ok(CategoryChanges {
            name,
            description: self.description.flatten(),
            is_active: self.is_active.unwrap_or(true),
        })
    }

    /// Validate an update. Absent fields keep the stored value.
    ///
    /// # Errors
    ///
    /// Returns `MissingCategoryName` if the name is blank.
    pub fn into_update(self, current: &Category) -> Result<CategoryChanges, MissingCategoryName> {
        let name = super::non_blank(self.name.as_deref()).ok_or(MissingCategoryName)?;

        Ok(CategoryChanges {
            name,
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            is_active: self.is_active.unwrap_or(current.is_active),
        })
    }
}

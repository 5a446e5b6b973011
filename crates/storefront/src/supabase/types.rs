//! Row types for the backend tables.
//!
//! Field names follow the column names, so rows deserialize straight from
//! REST responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wholesale_core::{CategoryId, CustomerGroupId, LanguageId, PriceId, ProductId, UserId};

/// A catalog product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub part_name: String,
    pub part_code: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

/// Insert payload for `products`.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub part_name: String,
    pub part_code: String,
    pub group_name: Option<String>,
    pub image: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// A product category with its default (untranslated) name.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRow {
    pub id: CategoryId,
    pub category_name: String,
}

/// Translated category name for one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTranslationRow {
    pub category_id: CategoryId,
    pub language_id: LanguageId,
    pub category_name: String,
}

/// A language translations can be written in.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRow {
    pub id: LanguageId,
    pub name: String,
    pub code: String,
}

/// Translated product name for one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTranslationRow {
    pub product_id: ProductId,
    pub language_id: LanguageId,
    pub part_name: String,
}

/// Unit price of a product for one customer group.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRow {
    pub id: PriceId,
    pub product_id: ProductId,
    pub customer_group_id: CustomerGroupId,
    pub price: Decimal,
}

/// Price row with the embedded customer group name.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceWithGroupRow {
    pub id: PriceId,
    pub product_id: ProductId,
    pub customer_group_id: CustomerGroupId,
    pub price: Decimal,
    #[serde(default)]
    pub customer_groups: Option<GroupNameRow>,
}

/// Embedded `customer_groups(group_name)` relation.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupNameRow {
    pub group_name: String,
}

/// Upsert payload for `prices`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPrice {
    pub product_id: ProductId,
    pub customer_group_id: CustomerGroupId,
    pub price: Decimal,
}

/// A pricing tier.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerGroupRow {
    pub id: CustomerGroupId,
    pub group_name: String,
}

/// A user profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub customer_group: Option<CustomerGroupId>,
    #[serde(default)]
    pub role: Option<String>,
}

impl ProfileRow {
    /// First and last name joined, or `None` when both are blank.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_with_group_accepts_numeric_json() {
        let json = r#"[{"id":1,"product_id":7,"customer_group_id":2,"price":12.5,"customer_groups":{"group_name":"Dealers"}}]"#;
        let rows: Vec<PriceWithGroupRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].price, Decimal::new(125, 1));
        assert_eq!(
            rows[0].customer_groups.as_ref().unwrap().group_name,
            "Dealers"
        );
    }

    #[test]
    fn test_product_row_optional_columns() {
        let json = r#"{"id":3,"part_name":"Seed drill","part_code":"SD-1"}"#;
        let row: ProductRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, ProductId::new(3));
        assert!(row.image.is_none());
        assert!(row.category_id.is_none());
    }

    #[test]
    fn test_profile_full_name() {
        let json = r#"{"id":"2b7c1d9e-52f4-4a4b-9d36-7d3a3c1e8f10","first_name":"Ona","last_name":" ","customer_group":null}"#;
        let row: ProfileRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.full_name().as_deref(), Some("Ona"));
        assert!(row.customer_group.is_none());
    }
}

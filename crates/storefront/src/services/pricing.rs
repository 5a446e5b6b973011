//! Server-side order pricing.
//!
//! Carts arrive from the browser with whatever prices the page showed. None
//! of those prices are trusted: every line is re-priced from the caller's
//! customer group before anything is sent or displayed as an order.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;
use wholesale_core::{CurrencyCode, CustomerGroupId, Price, ProductId};

use crate::supabase::{PriceRow, ProductRow};

/// Largest quantity accepted for a single product.
pub const MAX_QUANTITY: i64 = 10_000;

/// Largest number of distinct products in one order.
pub const MAX_LINES: usize = 200;

/// Reasons an order cannot be priced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("cart has more than {MAX_LINES} products")]
    TooManyLines,

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error("unknown product {0}")]
    UnknownProduct(ProductId),

    #[error("product {0} has no price for your customer group")]
    MissingPrice(ProductId),
}

/// One line as requested by the caller.
#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price the caller believes applies; only compared, never used.
    pub client_price: Option<Decimal>,
}

/// Unit prices of one customer group.
#[derive(Debug, Clone)]
pub struct PriceBook {
    group: CustomerGroupId,
    prices: HashMap<ProductId, Decimal>,
}

impl PriceBook {
    /// Build the price book for `group`, ignoring rows of other groups.
    #[must_use]
    pub fn for_group(group: CustomerGroupId, rows: &[PriceRow]) -> Self {
        let prices = rows
            .iter()
            .filter(|row| row.customer_group_id == group)
            .map(|row| (row.product_id, row.price))
            .collect();
        Self { group, prices }
    }

    /// A price book with no prices, for callers without a customer group.
    #[must_use]
    pub fn empty(group: CustomerGroupId) -> Self {
        Self {
            group,
            prices: HashMap::new(),
        }
    }

    /// The group this book prices for.
    #[must_use]
    pub const fn group(&self) -> CustomerGroupId {
        self.group
    }

    /// Unit price of a product, if the group has one.
    #[must_use]
    pub fn unit_price(&self, product: ProductId) -> Option<Price> {
        self.prices.get(&product).copied().map(Price::eur)
    }
}

/// A re-priced order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub part_name: String,
    pub part_code: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// A fully priced order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: Price,
}

/// Merge lines that name the same product, keeping first-seen order.
///
/// Quantities are validated after merging, so two lines of 6 000 are
/// rejected just like one line of 12 000.
fn merge_lines(requested: &[OrderLineRequest]) -> Result<Vec<(ProductId, u32)>, PricingError> {
    let mut order: Vec<ProductId> = Vec::new();
    let mut quantities: HashMap<ProductId, i64> = HashMap::new();

    for line in requested {
        if line.quantity <= 0 {
            return Err(PricingError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        let entry = quantities.entry(line.product_id).or_insert_with(|| {
            order.push(line.product_id);
            0
        });
        *entry = entry.saturating_add(line.quantity);
    }

    if order.len() > MAX_LINES {
        return Err(PricingError::TooManyLines);
    }

    order
        .into_iter()
        .map(|product_id| {
            let quantity = quantities.get(&product_id).copied().unwrap_or_default();
            if quantity > MAX_QUANTITY {
                return Err(PricingError::InvalidQuantity {
                    product_id,
                    quantity,
                });
            }
            u32::try_from(quantity)
                .map(|q| (product_id, q))
                .map_err(|_| PricingError::InvalidQuantity {
                    product_id,
                    quantity,
                })
        })
        .collect()
}

/// Check the requested lines before anything is looked up.
///
/// Returns the merged `(product, quantity)` lines in first-seen order.
///
/// # Errors
///
/// Returns `PricingError` if the cart is empty, names more than
/// `MAX_LINES` products, or a merged quantity is outside `1..=MAX_QUANTITY`.
pub fn validate_lines(
    requested: &[OrderLineRequest],
) -> Result<Vec<(ProductId, u32)>, PricingError> {
    if requested.is_empty() {
        return Err(PricingError::EmptyCart);
    }
    merge_lines(requested)
}

/// Price an order from authoritative product and price data.
///
/// # Errors
///
/// Returns `PricingError` if the cart is empty or too large, a quantity is
/// outside `1..=MAX_QUANTITY`, a product does not exist, or the group has no
/// price for a product.
pub fn price_order(
    requested: &[OrderLineRequest],
    products: &[ProductRow],
    book: &PriceBook,
) -> Result<PricedOrder, PricingError> {
    let merged = validate_lines(requested)?;
    let catalog: HashMap<ProductId, &ProductRow> =
        products.iter().map(|product| (product.id, product)).collect();

    let mut lines = Vec::with_capacity(merged.len());
    for (product_id, quantity) in merged {
        let product = catalog
            .get(&product_id)
            .ok_or(PricingError::UnknownProduct(product_id))?;
        let unit_price = book
            .unit_price(product_id)
            .ok_or(PricingError::MissingPrice(product_id))?;

        lines.push(PricedLine {
            product_id,
            part_name: product.part_name.clone(),
            part_code: product.part_code.clone(),
            quantity,
            unit_price,
            line_total: unit_price.times(quantity),
        });
    }

    for line in requested {
        if let (Some(claimed), Some(actual)) = (line.client_price, book.unit_price(line.product_id))
            && claimed != actual.amount
        {
            tracing::warn!(
                product_id = %line.product_id,
                customer_group = %book.group(),
                claimed = %claimed,
                actual = %actual.amount,
                "Client price differs from price book; using price book"
            );
        }
    }

    let total = lines
        .iter()
        .fold(Price::zero(CurrencyCode::EUR), |sum, line| {
            Price::eur(sum.amount + line.line_total.amount)
        });

    Ok(PricedOrder {
        lines,
        total: Price::eur(total.rounded()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use wholesale_core::PriceId;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product(id: i64, name: &str) -> ProductRow {
        ProductRow {
            id: ProductId::new(id),
            part_name: name.to_string(),
            part_code: format!("P-{id}"),
            group_name: None,
            image: None,
            category_id: None,
        }
    }

    fn price(id: i64, product: i64, group: i64, amount: &str) -> PriceRow {
        PriceRow {
            id: PriceId::new(id),
            product_id: ProductId::new(product),
            customer_group_id: CustomerGroupId::new(group),
            price: dec(amount),
        }
    }

    fn line(product: i64, quantity: i64) -> OrderLineRequest {
        OrderLineRequest {
            product_id: ProductId::new(product),
            quantity,
            client_price: None,
        }
    }

    fn fixtures() -> (Vec<ProductRow>, PriceBook) {
        let products = vec![product(1, "Seed drill"), product(2, "Harrow tine")];
        let rows = vec![
            price(1, 1, 1, "100.00"),
            price(2, 1, 2, "80.00"),
            price(3, 2, 2, "2.35"),
        ];
        (products, PriceBook::for_group(CustomerGroupId::new(2), &rows))
    }

    #[test]
    fn test_prices_from_group_not_client() {
        let (products, book) = fixtures();
        let requested = vec![OrderLineRequest {
            product_id: ProductId::new(1),
            quantity: 2,
            client_price: Some(dec("0.01")),
        }];

        let order = price_order(&requested, &products, &book).unwrap();
        assert_eq!(order.lines[0].unit_price, Price::eur(dec("80.00")));
        assert_eq!(order.total.display(), "160.00€");
    }

    #[test]
    fn test_total_sums_lines() {
        let (products, book) = fixtures();
        let order = price_order(&[line(1, 1), line(2, 3)], &products, &book).unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[1].line_total.amount, dec("7.05"));
        assert_eq!(order.total.amount, dec("87.05"));
    }

    #[test]
    fn test_duplicate_lines_merge_in_first_seen_order() {
        let (products, book) = fixtures();
        let order =
            price_order(&[line(2, 1), line(1, 1), line(2, 4)], &products, &book).unwrap();
        let ids: Vec<_> = order.lines.iter().map(|l| l.product_id.as_i64()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(order.lines[0].quantity, 5);
    }

    #[test]
    fn test_rejects_empty_cart() {
        let (products, book) = fixtures();
        assert_eq!(
            price_order(&[], &products, &book),
            Err(PricingError::EmptyCart)
        );
    }

    #[test]
    fn test_rejects_bad_quantities() {
        let (products, book) = fixtures();
        assert!(matches!(
            price_order(&[line(1, 0)], &products, &book),
            Err(PricingError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            price_order(&[line(1, -3)], &products, &book),
            Err(PricingError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            price_order(&[line(1, 6_000), line(1, 6_000)], &products, &book),
            Err(PricingError::InvalidQuantity {
                quantity: 12_000,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_too_many_products() {
        let (products, book) = fixtures();
        let lines: Vec<_> = (1..=i64::try_from(MAX_LINES).unwrap() + 1)
            .map(|id| line(id, 1))
            .collect();
        assert_eq!(
            price_order(&lines, &products, &book),
            Err(PricingError::TooManyLines)
        );
    }

    #[test]
    fn test_repeated_product_counts_as_one_line() {
        let lines: Vec<_> = (0..MAX_LINES + 50).map(|_| line(1, 1)).collect();
        let merged = validate_lines(&lines).unwrap();
        assert_eq!(merged, vec![(ProductId::new(1), 250)]);
    }

    #[test]
    fn test_validate_lines_needs_no_catalog() {
        assert_eq!(validate_lines(&[]), Err(PricingError::EmptyCart));
        assert!(matches!(
            validate_lines(&[line(7, 0)]),
            Err(PricingError::InvalidQuantity { quantity: 0, .. })
        ));
        assert_eq!(
            validate_lines(&[line(7, 2), line(3, 1)]).unwrap(),
            vec![(ProductId::new(7), 2), (ProductId::new(3), 1)]
        );
    }

    #[test]
    fn test_rejects_unknown_product() {
        let (products, book) = fixtures();
        assert_eq!(
            price_order(&[line(99, 1)], &products, &book),
            Err(PricingError::UnknownProduct(ProductId::new(99)))
        );
    }

    #[test]
    fn test_rejects_product_without_group_price() {
        let products = vec![product(1, "Seed drill")];
        let rows = vec![price(1, 1, 1, "100.00")];
        let book = PriceBook::for_group(CustomerGroupId::new(3), &rows);
        assert_eq!(
            price_order(&[line(1, 1)], &products, &book),
            Err(PricingError::MissingPrice(ProductId::new(1)))
        );
    }

    #[test]
    fn test_book_ignores_other_groups() {
        let (_, book) = fixtures();
        assert_eq!(book.group(), CustomerGroupId::new(2));
        assert!(book.unit_price(ProductId::new(2)).is_some());
        assert!(PriceBook::empty(CustomerGroupId::new(2))
            .unit_price(ProductId::new(2))
            .is_none());
    }
}

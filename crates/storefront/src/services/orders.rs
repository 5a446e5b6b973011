//! Order confirmation.
//!
//! Re-prices the requested lines for the caller's customer group and mails
//! the confirmation. Nothing is persisted; the email is the order record.

use askama::Template;
use thiserror::Error;
use tracing::instrument;
use wholesale_core::{CustomerGroupId, Email, ProductId};

use crate::models::CurrentUser;
use crate::services::email::{EmailError, OutgoingEmail};
use crate::services::pricing::{
    OrderLineRequest, PriceBook, PricedOrder, PricingError, price_order, validate_lines,
};
use crate::state::AppState;
use crate::supabase::{SupabaseError, Tables};

/// Subject line of the confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "Order Confirmation";

/// Errors that can occur while confirming an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("no customer group assigned to this account")]
    NoCustomerGroup,

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("backend error: {0}")]
    Supabase(#[from] SupabaseError),

    #[error("email error: {0}")]
    Email(#[from] EmailError),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

impl OrderError {
    /// Whether the caller's input (rather than a dependency) caused the failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::NoCustomerGroup | Self::Pricing(_))
    }
}

/// One line of the confirmation email.
struct EmailLine {
    part_name: String,
    quantity: u32,
    unit_price: String,
}

/// Order confirmation email body.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationEmail {
    lines: Vec<EmailLine>,
    total: String,
}

impl From<&PricedOrder> for OrderConfirmationEmail {
    fn from(order: &PricedOrder) -> Self {
        Self {
            lines: order
                .lines
                .iter()
                .map(|line| EmailLine {
                    part_name: line.part_name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price.amount_string(),
                })
                .collect(),
            total: order.total.amount_string(),
        }
    }
}

/// Render the HTML body for a priced order.
///
/// # Errors
///
/// Returns error if the template fails to render.
pub fn render_confirmation(order: &PricedOrder) -> Result<String, askama::Error> {
    OrderConfirmationEmail::from(order).render()
}

/// The customer group whose prices apply to a user.
///
/// # Errors
///
/// Returns `NoCustomerGroup` when the profile is missing or unassigned.
pub async fn customer_group_for(
    tables: Tables<'_>,
    user: &CurrentUser,
) -> Result<CustomerGroupId, OrderError> {
    tables
        .profile(user.id)
        .await?
        .and_then(|profile| profile.customer_group)
        .ok_or(OrderError::NoCustomerGroup)
}

/// Price the requested lines for the user's customer group.
///
/// # Errors
///
/// Returns error if the user has no group, a line cannot be priced, or the
/// backend cannot be reached.
pub async fn quote_order(
    state: &AppState,
    user: &CurrentUser,
    lines: &[OrderLineRequest],
) -> Result<PricedOrder, OrderError> {
    let ids: Vec<ProductId> = validate_lines(lines)?
        .into_iter()
        .map(|(product_id, _)| product_id)
        .collect();

    let tables = state.supabase().tables(&user.access_token);
    let group = customer_group_for(tables, user).await?;

    let products = tables.products_by_ids(&ids).await?;
    let prices = tables.prices_for_group(group, Some(&ids)).await?;
    let book = PriceBook::for_group(group, &prices);

    Ok(price_order(lines, &products, &book)?)
}

/// Price an order server-side and email the confirmation to `recipient`.
///
/// # Errors
///
/// Returns error if pricing fails (nothing is sent) or the email cannot be
/// rendered or delivered.
#[instrument(skip(state, user, lines), fields(user_id = %user.id, lines = lines.len()))]
pub async fn send_order_confirmation(
    state: &AppState,
    user: &CurrentUser,
    recipient: &Email,
    lines: &[OrderLineRequest],
) -> Result<PricedOrder, OrderError> {
    let order = quote_order(state, user, lines).await?;
    let html = render_confirmation(&order)?;

    state
        .email()
        .send(&OutgoingEmail {
            to: recipient.clone(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            html,
        })
        .await?;

    tracing::info!(
        total = %order.total,
        lines = order.lines.len(),
        "Order confirmation sent"
    );
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use wholesale_core::Price;

    use super::*;
    use crate::services::pricing::PricedLine;

    fn order() -> PricedOrder {
        PricedOrder {
            lines: vec![
                PricedLine {
                    product_id: ProductId::new(1),
                    part_name: "Seed drill".to_string(),
                    part_code: "SD-1".to_string(),
                    quantity: 2,
                    unit_price: Price::eur(Decimal::new(8000, 2)),
                    line_total: Price::eur(Decimal::new(16000, 2)),
                },
                PricedLine {
                    product_id: ProductId::new(2),
                    part_name: "Tine & bolt".to_string(),
                    part_code: "TB-2".to_string(),
                    quantity: 3,
                    unit_price: Price::eur(Decimal::new(235, 2)),
                    line_total: Price::eur(Decimal::new(705, 2)),
                },
            ],
            total: Price::eur(Decimal::new(16705, 2)),
        }
    }

    #[test]
    fn test_render_confirmation_lines() {
        let html = render_confirmation(&order()).unwrap();
        assert!(html.contains("Thank you for your order!"));
        assert!(html.contains("Order Details:"));
        assert!(html.contains("Seed drill (x2) - 80.00€ each"));
        assert!(html.contains("Total Amount: 167.05€"));
    }

    #[test]
    fn test_render_confirmation_escapes_names() {
        let html = render_confirmation(&order()).unwrap();
        assert!(!html.contains("Tine & bolt"));
        assert!(html.contains("bolt (x3) - 2.35€ each"));
    }

    #[test]
    fn test_client_errors() {
        assert!(OrderError::NoCustomerGroup.is_client_error());
        let empty = OrderError::Pricing(PricingError::EmptyCart);
        assert!(empty.is_client_error());
        let backend = OrderError::Supabase(SupabaseError::MissingServiceKey);
        assert!(!backend.is_client_error());
    }
}

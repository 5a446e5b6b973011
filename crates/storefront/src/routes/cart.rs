//! Cart route handlers.
//!
//! The cart lives in the session as product ids and quantities. Prices are
//! computed for the viewer's customer group every time the cart is shown and
//! again at checkout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use wholesale_core::{CurrencyCode, Price, ProductId};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::{AuthenticatedUser, CartItem, keys};
use crate::routes::layout::PageContext;
use crate::routes::{local_path, or_empty};
use crate::services::localization::{localize_product_names, resolve_language};
use crate::services::orders::send_order_confirmation;
use crate::services::pricing::{MAX_QUANTITY, OrderLineRequest, PriceBook};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart lines from the session.
async fn load_cart(session: &Session) -> Vec<CartItem> {
    match session.get::<Vec<CartItem>>(keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read cart");
            Vec::new()
        }
    }
}

/// Store the cart lines in the session.
async fn save_cart(session: &Session, cart: &[CartItem]) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// Add `quantity` of a product, merging with an existing line.
fn add_item(cart: &mut Vec<CartItem>, product_id: ProductId, quantity: u32) {
    let cap = u32::try_from(MAX_QUANTITY).unwrap_or(u32::MAX);
    match cart.iter_mut().find(|item| item.product_id == product_id) {
        Some(item) => item.quantity = item.quantity.saturating_add(quantity).min(cap),
        None => cart.push(CartItem {
            product_id,
            quantity: quantity.min(cap),
        }),
    }
}

/// Remove a product's line.
fn remove_item(cart: &mut Vec<CartItem>, product_id: ProductId) {
    cart.retain(|item| item.product_id != product_id);
}

// =============================================================================
// View Types
// =============================================================================

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub part_code: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Option<String>,
    pub line_total: Option<String>,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    /// Some lines have no price for the viewer's group.
    pub has_unpriced: bool,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total: Price::zero(CurrencyCode::EUR).display(),
            has_unpriced: false,
        }
    }
}

/// Build the cart view with prices for the viewer's customer group.
async fn build_cart_view(
    state: &AppState,
    user: &AuthenticatedUser,
    page: &PageContext,
    cart: &[CartItem],
) -> CartView {
    let tables = state.supabase().tables(&user.user.access_token);
    let ids: Vec<ProductId> = cart.iter().map(|item| item.product_id).collect();

    let languages = or_empty(tables.languages().await, "languages");
    let language_id = resolve_language(&languages, &page.language).map(|l| l.id);

    let (products, translations, profile) = tokio::join!(
        tables.products_by_ids(&ids),
        tables.product_translations(language_id),
        tables.profile(user.user.id),
    );
    let products = or_empty(products, "cart products");
    let names = localize_product_names(
        &products,
        &or_empty(translations, "product translations"),
        language_id,
    );

    let group = profile.ok().flatten().and_then(|p| p.customer_group);
    let book = match group {
        Some(group) => Some(PriceBook::for_group(
            group,
            &or_empty(tables.prices_for_group(group, Some(&ids)).await, "prices"),
        )),
        None => None,
    };

    let mut total = Price::zero(CurrencyCode::EUR);
    let mut has_unpriced = false;
    let mut lines = Vec::with_capacity(cart.len());

    for item in cart {
        let Some(product) = products.iter().find(|p| p.id == item.product_id) else {
            tracing::warn!(product_id = %item.product_id, "Cart product no longer exists");
            continue;
        };

        let unit_price = book.as_ref().and_then(|b| b.unit_price(item.product_id));
        let line_total = unit_price.map(|price| price.times(item.quantity));
        match line_total {
            Some(line_total) => total = Price::eur(total.amount + line_total.amount),
            None => has_unpriced = true,
        }

        lines.push(CartLineView {
            product_id: item.product_id,
            part_code: product.part_code.clone(),
            name: names
                .get(&item.product_id)
                .cloned()
                .unwrap_or_else(|| product.part_name.clone()),
            quantity: item.quantity,
            unit_price: unit_price.map(|p| p.display()),
            line_total: line_total.map(|p| p.display()),
        });
    }

    CartView {
        lines,
        total: total.display(),
        has_unpriced,
    }
}

// =============================================================================
// Forms and Templates
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    /// Blank means one.
    pub quantity: Option<String>,
    pub next: Option<String>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Query parameters for status display.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub status: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub cart: CartView,
    pub message: Option<&'static str>,
    pub is_error: bool,
}

/// Message id for a `?status=` code and whether it is an error.
fn status_message(status: Option<&str>) -> Option<(&'static str, bool)> {
    match status? {
        "sent" => Some(("cart-status-sent", false)),
        "empty" => Some(("cart-status-empty", true)),
        "invalid" => Some(("cart-status-pricing", true)),
        "failed" => Some(("cart-status-failed", true)),
        "quantity" => Some(("cart-status-quantity", true)),
        _ => None,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip_all, fields(user_id = %user.user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: PageContext,
    Query(query): Query<CartQuery>,
) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    let cart = if cart.is_empty() {
        CartView::empty()
    } else {
        build_cart_view(&state, &user, &page, &cart).await
    };

    let status = status_message(query.status.as_deref());
    CartTemplate {
        page,
        cart,
        message: status.map(|(message, _)| message),
        is_error: status.is_some_and(|(_, is_error)| is_error),
    }
}

/// Add a product to the cart.
#[instrument(skip(session))]
pub async fn add(session: Session, Form(form): Form<AddToCartForm>) -> Result<Response> {
    let quantity = match form.quantity.as_deref().map(str::trim) {
        None | Some("") => Some(1),
        Some(value) => value.parse::<u32>().ok().filter(|q| *q >= 1),
    };
    let Some(quantity) = quantity.filter(|q| i64::from(*q) <= MAX_QUANTITY) else {
        return Ok(Redirect::to("/cart?status=quantity").into_response());
    };

    let mut cart = load_cart(&session).await;
    add_item(&mut cart, form.product_id, quantity);
    save_cart(&session, &cart).await?;

    Ok(Redirect::to(local_path(form.next.as_deref(), "/cart")).into_response())
}

/// Remove a product from the cart.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;
    remove_item(&mut cart, form.product_id);
    save_cart(&session, &cart).await?;
    Ok(Redirect::to("/cart"))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect> {
    save_cart(&session, &[]).await?;
    Ok(Redirect::to("/cart"))
}

/// Send the order confirmation for the cart to the signed-in user.
#[instrument(skip_all, fields(user_id = %user.user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Response {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Redirect::to("/cart?status=empty").into_response();
    }

    let lines: Vec<OrderLineRequest> = cart
        .iter()
        .map(|item| OrderLineRequest {
            product_id: item.product_id,
            quantity: i64::from(item.quantity),
            client_price: None,
        })
        .collect();

    match send_order_confirmation(&state, &user.user, &user.user.email, &lines).await {
        Ok(_) => {
            // Already sent; a failed clear is only logged.
            if let Err(e) = save_cart(&session, &[]).await {
                tracing::error!(error = %e, "Failed to clear cart after checkout");
            }
            Redirect::to("/cart?status=sent").into_response()
        }
        Err(e) if e.is_client_error() => {
            tracing::info!(error = %e, "Checkout rejected");
            Redirect::to("/cart?status=invalid").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Checkout failed");
            Redirect::to("/cart?status=failed").into_response()
        }
    }
}

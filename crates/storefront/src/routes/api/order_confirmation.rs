//! `POST /api/send-order-confirmation`.
//!
//! Accepts `{email, cart: [{product_id, quantity, price?}]}` from the
//! storefront script. Every price is recomputed for the caller's customer
//! group; the `price` a client sends is only compared and logged.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use wholesale_core::{Email, ProductId};

use crate::middleware::RequireUser;
use crate::services::orders::send_order_confirmation;
use crate::services::pricing::OrderLineRequest;
use crate::state::AppState;

/// One cart line as sent by the client.
#[derive(Debug, Deserialize)]
pub struct CartLinePayload {
    #[serde(alias = "id")]
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Display name the client showed; ignored.
    #[serde(default)]
    pub part_name: Option<String>,
}

/// Request body.
#[derive(Debug, Deserialize)]
pub struct OrderConfirmationPayload {
    pub email: String,
    pub cart: Vec<CartLinePayload>,
}

/// Response body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

fn reply(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(MessageResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

/// Price the cart server-side and email the confirmation.
#[instrument(skip_all, fields(user_id = %user.user.id))]
pub async fn send(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: Result<Json<OrderConfirmationPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Malformed order confirmation request");
            return reply(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let Ok(recipient) = Email::parse(&payload.email) else {
        return reply(StatusCode::BAD_REQUEST, "Invalid email address");
    };

    let lines: Vec<OrderLineRequest> = payload
        .cart
        .iter()
        .map(|line| OrderLineRequest {
            product_id: line.product_id,
            quantity: line.quantity,
            client_price: line.price,
        })
        .collect();

    match send_order_confirmation(&state, &user.user, &recipient, &lines).await {
        Ok(order) => {
            tracing::info!(total = %order.total, "Order confirmation sent via API");
            reply(StatusCode::OK, "Email sent successfully")
        }
        Err(e) if e.is_client_error() => {
            tracing::info!(error = %e, "Order confirmation rejected");
            reply(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to send order confirmation");
            reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email")
        }
    }
}

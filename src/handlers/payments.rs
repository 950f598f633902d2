use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{errors::ServiceError, services::PaymentOutcome, AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Only the reference is read; everything else on the redirect is ignored.
    pub reference: Option<String>,
}

/// GET /paystack/callback?reference=...
///
/// Re-verifies the transaction server-side before touching the order.
#[instrument(skip(state))]
pub async fn paystack_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ServiceError> {
    let reference = query.reference.unwrap_or_default();

    match state
        .services
        .checkout
        .reconcile_payment(&reference)
        .await?
    {
        PaymentOutcome::Paid(order) => {
            info!(order_id = order.id, "Payment confirmed");
            Ok(Redirect::to(&format!("/order/{}", order.id)).into_response())
        }
        PaymentOutcome::NotPaid { order, status } => {
            info!(order_id = order.id, status = %status, "Payment not completed");
            Ok((
                StatusCode::OK,
                format!("Payment not successful. Status: {}", status),
            )
                .into_response())
        }
    }
}

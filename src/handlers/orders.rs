use axum::{
    extract::{Path, State},
    response::Response,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::{
    entities::order::{Model as OrderModel, OrderStatus},
    errors::ServiceError,
    handlers::common::success_response,
    AppState,
};

/// Receipt shown after a confirmed payment.
#[derive(Debug, Serialize)]
pub struct ReceiptView {
    pub order_id: i32,
    pub network: String,
    pub plan: String,
    pub recipient_phone: String,
    pub status: OrderStatus,
    /// True only for orders settled by a successful verification
    pub paid: bool,
    /// Minor units
    pub amount: Option<i64>,
    /// Major units, two decimal places
    pub amount_display: Option<Decimal>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderModel> for ReceiptView {
    fn from(order: OrderModel) -> Self {
        let status = order.order_status();
        Self {
            paid: status == OrderStatus::Paid,
            status,
            order_id: order.id,
            network: order.network,
            plan: order.plan,
            recipient_phone: order.phone,
            amount: order.amount,
            amount_display: order.amount.map(|minor| Decimal::new(minor, 2)),
            reference: order.paystack_reference,
            created_at: order.created_at,
        }
    }
}

/// GET /order/:order_id
#[instrument(skip(state))]
pub async fn receipt(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .ledger
        .find_order(order_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

    Ok(success_response(ReceiptView::from(order)))
}

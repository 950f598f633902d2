use axum::{
    extract::{Host, Path, State},
    http::HeaderMap,
    response::Redirect,
    Form,
};
use tracing::{info, instrument};

use crate::{
    errors::ServiceError, handlers::common::callback_url, services::CheckoutDetails, AppState,
};

/// POST /checkout/:network/:plan
///
/// Opens a pending order and sends the buyer to the gateway's hosted page.
#[instrument(skip(state, host, headers, details))]
pub async fn submit_checkout(
    State(state): State<AppState>,
    Path((network, plan)): Path<(String, String)>,
    host: Option<Host>,
    headers: HeaderMap,
    Form(details): Form<CheckoutDetails>,
) -> Result<Redirect, ServiceError> {
    let host = host.map(|Host(host)| host);
    let callback = || callback_url(&state.config, host.as_deref(), &headers);

    let redirect = state
        .services
        .checkout
        .start_checkout(&network, &plan, details, callback)
        .await?;

    info!(
        order_id = redirect.order_id,
        reference = %redirect.reference,
        "Checkout started"
    );
    Ok(Redirect::to(&redirect.authorization_url))
}

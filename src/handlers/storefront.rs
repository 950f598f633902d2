use axum::{
    extract::{Path, State},
    response::Response,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::{
    catalog::{self, Network, Offer},
    errors::ServiceError,
    handlers::common::success_response,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub active: &'static str,
    pub wallet_balance: String,
}

#[derive(Debug, Serialize)]
pub struct OfferView {
    pub plan: &'static str,
    pub price: Decimal,
    /// Minor units
    pub amount: Option<i64>,
}

impl From<Offer> for OfferView {
    fn from(offer: Offer) -> Self {
        Self {
            plan: offer.plan,
            price: offer.price,
            amount: offer.amount(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BuyView {
    pub networks: &'static [Network],
    pub selected: Option<Network>,
    pub offers: Vec<OfferView>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutFormView {
    pub network: Network,
    pub plan: &'static str,
    pub price: Decimal,
    pub amount: Option<i64>,
    pub currency: String,
    pub regions: &'static [&'static str],
}

/// GET /
pub async fn dashboard(State(state): State<AppState>) -> Response {
    success_response(DashboardView {
        active: "dashboard",
        wallet_balance: state.config.wallet_balance.clone(),
    })
}

/// GET /buy
pub async fn buy() -> Response {
    success_response(BuyView {
        networks: catalog::networks(),
        selected: None,
        offers: Vec::new(),
    })
}

/// GET /buy/:network
#[instrument]
pub async fn buy_network(Path(network): Path<String>) -> Result<Response, ServiceError> {
    let selected = catalog::network(&network)
        .ok_or_else(|| ServiceError::NotFound(format!("Unknown network: {}", network)))?;

    Ok(success_response(BuyView {
        networks: catalog::networks(),
        selected: Some(*selected),
        offers: catalog::offers_for(selected.key)
            .into_iter()
            .map(OfferView::from)
            .collect(),
    }))
}

/// GET /checkout/:network/:plan
#[instrument(skip(state))]
pub async fn checkout_form(
    State(state): State<AppState>,
    Path((network, plan)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let network = catalog::network(&network)
        .ok_or_else(|| ServiceError::NotFound(format!("Unknown network: {}", network)))?;
    let offer = catalog::offer(&plan)
        .ok_or_else(|| ServiceError::NotFound(format!("Unknown plan: {}", plan)))?;

    Ok(success_response(CheckoutFormView {
        network: *network,
        plan: offer.plan,
        price: offer.price,
        amount: offer.amount(),
        currency: state.config.paystack.currency.clone(),
        regions: catalog::regions(),
    }))
}

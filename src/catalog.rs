//! Static offer catalog: data plans, supported networks and delivery regions.
//!
//! Every network sells the same plans at the same price. Prices are exact
//! decimals in major units (cedis); the gateway charges in minor units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

/// A mobile network the storefront sells bundles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Network {
    /// URL key, lowercase (`mtn`)
    pub key: &'static str,
    /// Display and persisted label (`MTN`)
    pub label: &'static str,
    /// Logo asset path
    pub logo: &'static str,
}

/// One purchasable data plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Offer {
    pub plan: &'static str,
    pub price: Decimal,
}

impl Offer {
    /// Price in minor units; `None` if the price is not chargeable.
    pub fn amount(&self) -> Option<i64> {
        to_minor_units(self.price)
    }
}

const NETWORKS: [Network; 3] = [
    Network {
        key: "mtn",
        label: "MTN",
        logo: "img/mtn.png",
    },
    Network {
        key: "telecel",
        label: "TELECEL",
        logo: "img/telecel.png",
    },
    Network {
        key: "airteltigo",
        label: "AIRTELTIGO",
        logo: "img/airteltigo.png",
    },
];

const OFFERS: [Offer; 15] = [
    Offer { plan: "1GB", price: dec!(5.28) },
    Offer { plan: "2GB", price: dec!(10.44) },
    Offer { plan: "3GB", price: dec!(15.36) },
    Offer { plan: "4GB", price: dec!(20.88) },
    Offer { plan: "5GB", price: dec!(25.56) },
    Offer { plan: "6GB", price: dec!(30.72) },
    Offer { plan: "8GB", price: dec!(40.80) },
    Offer { plan: "10GB", price: dec!(47.49) },
    Offer { plan: "15GB", price: dec!(68.42) },
    Offer { plan: "20GB", price: dec!(90.50) },
    Offer { plan: "25GB", price: dec!(112.70) },
    Offer { plan: "30GB", price: dec!(135.70) },
    Offer { plan: "40GB", price: dec!(181.13) },
    Offer { plan: "50GB", price: dec!(223.10) },
    Offer { plan: "100GB", price: dec!(431.25) },
];

const REGIONS: [&str; 16] = [
    "Ahafo",
    "Ashanti",
    "Bono",
    "Bono East",
    "Central",
    "Eastern",
    "Greater Accra",
    "North East",
    "Northern",
    "Oti",
    "Savannah",
    "Upper East",
    "Upper West",
    "Volta",
    "Western",
    "Western North",
];

/// Converts a major-unit price to minor units, rounding half to even.
///
/// Returns `None` unless the result is a positive amount that fits in `i64`.
pub fn to_minor_units(price: Decimal) -> Option<i64> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .filter(|minor| *minor > 0)
}

pub fn offer(plan: &str) -> Option<&'static Offer> {
    OFFERS.iter().find(|o| o.plan == plan)
}

/// Minor-unit price of `plan`, if the catalog sells it.
pub fn price_of(plan: &str) -> Option<i64> {
    offer(plan).and_then(Offer::amount)
}

pub fn network(key: &str) -> Option<&'static Network> {
    let key = key.trim().to_lowercase();
    NETWORKS.iter().find(|n| n.key == key)
}

pub fn network_by_label(label: &str) -> Option<&'static Network> {
    NETWORKS.iter().find(|n| n.label == label)
}

pub fn is_known_network(key: &str) -> bool {
    network(key).is_some()
}

pub fn networks() -> &'static [Network] {
    &NETWORKS
}

/// Offers available on `network`, in catalog order; empty when unknown.
pub fn offers_for(network_key: &str) -> Vec<Offer> {
    if is_known_network(network_key) {
        OFFERS.to_vec()
    } else {
        Vec::new()
    }
}

pub fn regions() -> &'static [&'static str] {
    &REGIONS
}

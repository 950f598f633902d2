use std::sync::Arc;

use crate::{
    db::DbPool,
    services::{CheckoutService, GatewayHandle, OrderLedger, RandomReferenceGenerator, ReferenceGenerator},
};

pub mod checkout;
pub mod common;
pub mod health;
pub mod orders;
pub mod payments;
pub mod storefront;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: Arc<OrderLedger>,
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    /// Wires the services with the CSPRNG reference generator.
    pub fn new(db_pool: Arc<DbPool>, gateway: GatewayHandle, currency: &str) -> Self {
        Self::with_reference_generator(
            db_pool,
            gateway,
            currency,
            Arc::new(RandomReferenceGenerator),
        )
    }

    pub fn with_reference_generator(
        db_pool: Arc<DbPool>,
        gateway: GatewayHandle,
        currency: &str,
        references: Arc<dyn ReferenceGenerator>,
    ) -> Self {
        let ledger = OrderLedger::new(db_pool);
        let checkout = CheckoutService::new(ledger.clone(), gateway, references, currency);

        Self {
            ledger: Arc::new(ledger),
            checkout: Arc::new(checkout),
        }
    }
}

use std::sync::Arc;

use metrics::counter;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationError};

use crate::{
    catalog,
    entities::order::{Model as OrderModel, OrderStatus},
    errors::ServiceError,
    services::{
        gateway::{GatewayHandle, InitializeTransaction, TransactionMetadata},
        ledger::{OpenOrder, OrderLedger},
    },
};

/// Produces gateway references of the form `CDS_{LABEL}_{PLAN}_{suffix}`.
pub trait ReferenceGenerator: Send + Sync {
    fn generate(&self, network_label: &str, plan: &str) -> String;
}

/// Reference generator backed by the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomReferenceGenerator;

impl ReferenceGenerator for RandomReferenceGenerator {
    fn generate(&self, network_label: &str, plan: &str) -> String {
        let mut suffix = [0u8; 6];
        OsRng.fill_bytes(&mut suffix);
        format!("CDS_{}_{}_{}", network_label, plan, hex::encode(suffix))
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// Buyer details submitted with the checkout form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CheckoutDetails {
    #[validate(custom = "not_blank")]
    #[serde(default)]
    pub fullname: String,
    /// Buyer's contact phone
    #[validate(custom = "not_blank")]
    #[serde(default)]
    pub contact: String,
    #[validate(custom = "not_blank")]
    #[serde(default)]
    pub email: String,
    /// Delivery region; informational only
    #[serde(default)]
    pub location: Option<String>,
    /// Phone the bundle is delivered to
    #[validate(custom = "not_blank")]
    #[serde(default)]
    pub recipient_phone: String,
}

impl CheckoutDetails {
    fn trimmed(self) -> Self {
        Self {
            fullname: self.fullname.trim().to_string(),
            contact: self.contact.trim().to_string(),
            email: self.email.trim().to_string(),
            location: self
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            recipient_phone: self.recipient_phone.trim().to_string(),
        }
    }
}

/// Where to send the buyer once the order is open.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRedirect {
    pub order_id: i32,
    pub reference: String,
    pub authorization_url: String,
}

/// Result of reconciling a gateway callback.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Paid(OrderModel),
    NotPaid { order: OrderModel, status: String },
}

/// Drives a purchase from form submission to the gateway and back.
#[derive(Clone)]
pub struct CheckoutService {
    ledger: OrderLedger,
    gateway: GatewayHandle,
    references: Arc<dyn ReferenceGenerator>,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        ledger: OrderLedger,
        gateway: GatewayHandle,
        references: Arc<dyn ReferenceGenerator>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            references,
            currency: currency.into(),
        }
    }

    /// Opens a pending order and initializes the gateway transaction for it.
    ///
    /// `callback_url` is only resolved once the network and plan are known.
    /// A gateway failure leaves the order `pending` with its reference set.
    #[instrument(skip(self, details, callback_url))]
    pub async fn start_checkout<F>(
        &self,
        network_key: &str,
        plan: &str,
        details: CheckoutDetails,
        callback_url: F,
    ) -> Result<CheckoutRedirect, ServiceError>
    where
        F: FnOnce() -> Result<String, ServiceError>,
    {
        let network = catalog::network(network_key)
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown network: {}", network_key)))?;
        let offer = catalog::offer(plan)
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown plan: {}", plan)))?;
        let amount = offer.amount().ok_or_else(|| {
            ServiceError::InternalError(format!("Plan {} has no chargeable price", offer.plan))
        })?;

        let details = details.trimmed();
        details.validate()?;
        let callback_url = callback_url()?;

        let gateway = self.gateway.get()?;
        counter!("cds_checkout.started", 1, "network" => network.label);

        if let Some(location) = details.location.as_deref() {
            info!(location, "Delivery region supplied");
        }

        let reference = self.references.generate(network.label, offer.plan);

        let (customer, order) = self
            .ledger
            .open_order(OpenOrder {
                full_name: details.fullname,
                contact_phone: details.contact,
                email: details.email,
                recipient_phone: details.recipient_phone.clone(),
                network_label: network.label.to_string(),
                plan: offer.plan.to_string(),
                amount,
                reference: reference.clone(),
            })
            .await?;

        let request = InitializeTransaction {
            email: customer.email,
            amount,
            currency: self.currency.clone(),
            reference: reference.clone(),
            callback_url,
            metadata: TransactionMetadata {
                order_id: order.id,
                network: network.label.to_string(),
                plan: offer.plan.to_string(),
                recipient_phone: details.recipient_phone,
            },
        };

        let authorization_url = gateway.initialize(&request).await.map_err(|err| {
            warn!(
                order_id = order.id,
                reference = %reference,
                "Gateway initialization failed; order left pending: {}",
                err
            );
            err
        })?;

        counter!("cds_checkout.redirected", 1, "network" => network.label);
        info!(order_id = order.id, reference = %reference, "Redirecting buyer to gateway");

        Ok(CheckoutRedirect {
            order_id: order.id,
            reference,
            authorization_url,
        })
    }

    /// Verifies `reference` with the gateway and settles the matching order.
    ///
    /// Query parameters other than the reference are never consulted.
    #[instrument(skip(self))]
    pub async fn reconcile_payment(&self, reference: &str) -> Result<PaymentOutcome, ServiceError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ServiceError::BadRequest("Missing reference".to_string()));
        }

        let gateway = self.gateway.get()?;
        let verified = gateway.verify(reference).await?;
        let order = self.ledger.reconcile(reference, &verified.status).await?;

        if let (Some(charged), Some(expected)) = (verified.amount, order.amount) {
            if charged != expected {
                warn!(
                    order_id = order.id,
                    charged, expected, "Gateway amount differs from order amount"
                );
            }
        }

        if verified.status == "success" {
            return Ok(PaymentOutcome::Paid(order));
        }
        Ok(PaymentOutcome::NotPaid {
            order,
            status: OrderStatus::from_gateway(&verified.status).to_string(),
        })
    }
}

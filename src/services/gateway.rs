use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use metrics::counter;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::{
    config::{PaystackConfig, PAYSTACK_SECRET_ENV},
    errors::ServiceError,
};

/// Metadata echoed back by the gateway on the transaction record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionMetadata {
    pub order_id: i32,
    pub network: String,
    pub plan: String,
    pub recipient_phone: String,
}

/// Payload for starting a hosted payment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InitializeTransaction {
    pub email: String,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: TransactionMetadata,
}

/// Outcome of a server-side verification.
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    /// Gateway transaction status, e.g. `success`, `abandoned`; empty when absent
    pub status: String,
    /// Amount the gateway charged, in minor units
    pub amount: Option<i64>,
    /// Full `data` object as returned by the gateway
    pub raw: serde_json::Value,
}

/// A hosted-payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a transaction and returns the URL the buyer is sent to.
    async fn initialize(&self, request: &InitializeTransaction) -> Result<String, ServiceError>;

    /// Looks the transaction up on the provider's side.
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, ServiceError>;
}

/// The gateway as seen by request handlers.
///
/// The server starts without a secret key; payment routes then fail with a
/// configuration error before touching the database.
#[derive(Clone)]
pub enum GatewayHandle {
    Ready(Arc<dyn PaymentGateway>),
    Unconfigured(String),
}

impl GatewayHandle {
    pub fn from_config(config: &PaystackConfig) -> Self {
        match PaystackClient::new(config) {
            Ok(client) => GatewayHandle::Ready(Arc::new(client)),
            Err(err) => {
                warn!("Payment gateway unavailable: {}", err);
                GatewayHandle::Unconfigured(err.to_string())
            }
        }
    }

    pub fn get(&self) -> Result<Arc<dyn PaymentGateway>, ServiceError> {
        match self {
            GatewayHandle::Ready(gateway) => Ok(gateway.clone()),
            GatewayHandle::Unconfigured(reason) => {
                Err(ServiceError::ConfigurationError(reason.clone()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    #[serde(default)]
    authorization_url: Option<String>,
}

/// Paystack REST client
#[derive(Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    base_url: Url,
    secret_key: String,
}

impl std::fmt::Debug for PaystackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl PaystackClient {
    pub fn new(config: &PaystackConfig) -> Result<Self, ServiceError> {
        let secret_key = config
            .secret_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ServiceError::ConfigurationError(format!("{} not set", PAYSTACK_SECRET_ENV))
            })?
            .to_string();

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ServiceError::ConfigurationError(format!(
                "Invalid Paystack base URL {}: {}",
                config.base_url, e
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                ServiceError::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ServiceError::ConfigurationError(format!(
                    "Paystack base URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(operation: &str, err: reqwest::Error) -> ServiceError {
        counter!("cds_gateway.failures", 1, "operation" => operation.to_string());
        let timed_out = err.is_timeout();
        error!(operation, timed_out, "Paystack request failed: {}", err);
        ServiceError::GatewayUnavailable {
            message: format!("Paystack {} request failed: {}", operation, err),
            timed_out,
        }
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        operation: &str,
        response: reqwest::Response,
    ) -> Result<Envelope<T>, ServiceError> {
        let http_status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(operation, e))?;

        serde_json::from_slice::<Envelope<T>>(&body).map_err(|e| {
            counter!("cds_gateway.failures", 1, "operation" => operation.to_string());
            error!(operation, %http_status, "Unreadable Paystack response: {}", e);
            ServiceError::GatewayError(format!(
                "Paystack {} failed: unexpected response ({})",
                operation, http_status
            ))
        })
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn initialize(&self, request: &InitializeTransaction) -> Result<String, ServiceError> {
        let url = self.endpoint(&["transaction", "initialize"])?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| Self::transport_error("init", e))?;

        let envelope: Envelope<InitializeData> = Self::read_envelope("init", response).await?;
        if !envelope.status {
            counter!("cds_gateway.failures", 1, "operation" => "init");
            return Err(ServiceError::GatewayError(format!(
                "Paystack init failed: {}",
                envelope.message
            )));
        }

        let authorization_url = envelope
            .data
            .and_then(|data| data.authorization_url)
            .ok_or_else(|| {
                ServiceError::GatewayError(
                    "Paystack init failed: response carried no authorization URL".to_string(),
                )
            })?;

        info!("Paystack transaction initialized");
        Ok(authorization_url)
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, ServiceError> {
        let url = self.endpoint(&["transaction", "verify", reference])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Self::transport_error("verify", e))?;

        let envelope: Envelope<serde_json::Value> = Self::read_envelope("verify", response).await?;
        if !envelope.status {
            counter!("cds_gateway.failures", 1, "operation" => "verify");
            return Err(ServiceError::GatewayError(format!(
                "Paystack verify failed: {}",
                envelope.message
            )));
        }

        let raw = envelope.data.unwrap_or(serde_json::Value::Null);
        let status = raw
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string();
        let amount = raw.get("amount").and_then(|a| a.as_i64());

        info!(status = %status, "Paystack transaction verified");
        Ok(VerifiedTransaction {
            status,
            amount,
            raw,
        })
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt};

/// Marks a persisted gateway status whose raw text names an internal status.
const GATEWAY_PREFIX: &str = "gateway:";

/// Lifecycle state of a bundle order.
///
/// Orders start `Pending` and move to exactly one terminal state once the
/// gateway has confirmed the outcome. Statuses the gateway reports that have
/// no dedicated variant are kept verbatim in `Gateway`. Only `"success"`
/// settles an order to `Paid`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Gateway(String),
}

impl OrderStatus {
    /// Maps a verified gateway status onto the order status it settles to.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "success" => OrderStatus::Paid,
            "" | "failed" => OrderStatus::Failed,
            other => OrderStatus::Gateway(other.to_string()),
        }
    }

    /// Column form of the status.
    ///
    /// A gateway status spelled like `pending` or `paid` is stored prefixed so
    /// it reads back as the terminal gateway status it was.
    pub fn persisted(&self) -> Cow<'_, str> {
        match self {
            OrderStatus::Gateway(raw) if Self::is_reserved(raw) => {
                Cow::Owned(format!("{}{}", GATEWAY_PREFIX, raw))
            }
            other => Cow::Borrowed(other.as_str()),
        }
    }

    fn is_reserved(raw: &str) -> bool {
        matches!(raw, "pending" | "paid" | "failed") || raw.starts_with(GATEWAY_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Gateway(raw) => raw.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => OrderStatus::Pending,
            "paid" => OrderStatus::Paid,
            "failed" => OrderStatus::Failed,
            other => OrderStatus::Gateway(
                other.strip_prefix(GATEWAY_PREFIX).unwrap_or(other).to_string(),
            ),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The `orders` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Phone number the bundle is delivered to
    pub phone: String,

    /// Network label, e.g. `MTN`
    pub network: String,

    /// Plan identifier, e.g. `1GB`
    pub plan: String,

    /// Persisted form of [`OrderStatus`], see [`OrderStatus::persisted`]
    pub status: String,

    /// Gateway transaction reference; set once at creation, never changed
    #[sea_orm(unique, nullable)]
    pub paystack_reference: Option<String>,

    /// Amount charged in minor units (pesewas)
    #[sea_orm(nullable)]
    pub amount: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn order_status(&self) -> OrderStatus {
        OrderStatus::from(self.status.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use tracing::{error, info, instrument, warn};

use crate::{
    catalog,
    entities::{
        customer::{self, Model as CustomerModel},
        order::{self, Model as OrderModel, OrderStatus},
    },
    errors::ServiceError,
};

/// Everything needed to open an order in one transaction.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub full_name: String,
    pub contact_phone: String,
    pub email: String,
    pub recipient_phone: String,
    pub network_label: String,
    pub plan: String,
    pub amount: i64,
    pub reference: String,
}

/// Owns the `users` and `orders` tables and every status transition on them.
#[derive(Clone)]
pub struct OrderLedger {
    db: Arc<DatabaseConnection>,
}

impl OrderLedger {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts the customer or, when the email already exists, overwrites name and phone.
    #[instrument(skip(conn, full_name, phone))]
    pub async fn upsert_customer<C: ConnectionTrait>(
        conn: &C,
        full_name: &str,
        phone: &str,
        email: &str,
    ) -> Result<CustomerModel, ServiceError> {
        let full_name = full_name.trim();
        let phone = phone.trim();
        let email = email.trim().to_lowercase();

        if full_name.is_empty() || phone.is_empty() || email.is_empty() {
            return Err(ServiceError::ValidationError(
                "Full name, phone and email are required".to_string(),
            ));
        }

        let now = Utc::now();
        let model = customer::ActiveModel {
            id: NotSet,
            fullname: Set(full_name.to_string()),
            phone: Set(phone.to_string()),
            email: Set(email.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        customer::Entity::insert(model)
            .on_conflict(
                OnConflict::column(customer::Column::Email)
                    .update_columns([
                        customer::Column::Fullname,
                        customer::Column::Phone,
                        customer::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| {
                error!("Failed to upsert customer: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        customer::Entity::find()
            .filter(customer::Column::Email.eq(email.as_str()))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::InternalError("Upserted customer not readable".into()))
    }

    /// Creates a `pending` order after checking it against the catalog.
    #[instrument(skip(conn, recipient_phone))]
    pub async fn create_pending_order<C: ConnectionTrait>(
        conn: &C,
        recipient_phone: &str,
        network_label: &str,
        plan: &str,
        amount: i64,
    ) -> Result<OrderModel, ServiceError> {
        let recipient_phone = recipient_phone.trim();
        if recipient_phone.is_empty() {
            return Err(ServiceError::ValidationError(
                "Recipient phone is required".to_string(),
            ));
        }
        if catalog::network_by_label(network_label).is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Unknown network: {}",
                network_label
            )));
        }
        let expected = catalog::price_of(plan).ok_or_else(|| {
            ServiceError::ValidationError(format!("Unknown plan: {}", plan))
        })?;
        if amount != expected {
            return Err(ServiceError::ValidationError(format!(
                "Amount {} does not match the price of {} ({})",
                amount, plan, expected
            )));
        }

        let now = Utc::now();
        let order = order::ActiveModel {
            id: NotSet,
            phone: Set(recipient_phone.to_string()),
            network: Set(network_label.to_string()),
            plan: Set(plan.to_string()),
            status: Set(OrderStatus::Pending.to_string()),
            paystack_reference: Set(None),
            amount: Set(Some(amount)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = order.insert(conn).await.map_err(|e| {
            error!("Failed to create order: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = created.id, "Pending order created");
        Ok(created)
    }

    /// Attaches the gateway reference to an order. The reference never changes once set.
    #[instrument(skip(conn, order), fields(order_id = order.id))]
    pub async fn assign_payment_reference<C: ConnectionTrait>(
        conn: &C,
        order: &OrderModel,
        reference: &str,
    ) -> Result<OrderModel, ServiceError> {
        match order.paystack_reference.as_deref() {
            Some(existing) if existing == reference => return Ok(order.clone()),
            Some(existing) => {
                return Err(ServiceError::Conflict(format!(
                    "Order {} already carries reference {}",
                    order.id, existing
                )))
            }
            None => {}
        }

        let result = order::Entity::update_many()
            .col_expr(order::Column::PaystackReference, Expr::value(reference))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::PaystackReference.is_null())
            .exec(conn)
            .await
            .map_err(|e| {
                ServiceError::from_write(e, || {
                    format!("Payment reference {} is already in use", reference)
                })
            })?;

        let current = Self::reload(conn, order.id).await?;
        if result.rows_affected == 0
            && current.paystack_reference.as_deref() != Some(reference)
        {
            warn!(order_id = order.id, "Order reference was assigned concurrently");
            return Err(ServiceError::Conflict(format!(
                "Order {} already carries a different reference",
                order.id
            )));
        }

        Ok(current)
    }

    /// Upserts the customer, creates the order and assigns its reference atomically.
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    pub async fn open_order(
        &self,
        request: OpenOrder,
    ) -> Result<(CustomerModel, OrderModel), ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let result = async {
            let customer = Self::upsert_customer(
                &txn,
                &request.full_name,
                &request.contact_phone,
                &request.email,
            )
            .await?;
            let order = Self::create_pending_order(
                &txn,
                &request.recipient_phone,
                &request.network_label,
                &request.plan,
                request.amount,
            )
            .await?;
            let order = Self::assign_payment_reference(&txn, &order, &request.reference).await?;
            Ok::<_, ServiceError>((customer, order))
        }
        .await;

        match result {
            Ok(opened) => {
                txn.commit().await.map_err(|e| {
                    error!("Failed to commit order transaction: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                info!(order_id = opened.1.id, "Order opened");
                Ok(opened)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!("Failed to roll back order transaction: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Settles a pending order with the status the gateway verified.
    ///
    /// Applying the status an order already holds is a no-op; any other
    /// change to an order that is no longer pending is a conflict.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        reference: &str,
        gateway_status: &str,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db;
        let order = self.find_by_reference(reference).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("No order with reference {}", reference))
        })?;

        let target = OrderStatus::from_gateway(gateway_status);
        let current = order.order_status();

        if current == target {
            info!(order_id = order.id, status = %target, "Order already reconciled");
            return Ok(order);
        }
        if current.is_terminal() {
            return Err(Self::terminal_conflict(&order, &target));
        }

        let result = order::Entity::update_many()
            .col_expr(
                order::Column::Status,
                Expr::value(target.persisted().into_owned()),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
            .exec(db)
            .await?;

        let updated = Self::reload(db, order.id).await?;
        if result.rows_affected == 0 && updated.order_status() != target {
            return Err(Self::terminal_conflict(&updated, &target));
        }

        counter!("cds_orders.reconciled", 1, "status" => target.to_string());
        info!(order_id = updated.id, from = %current, to = %target, "Order reconciled");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn find_order(&self, order_id: i32) -> Result<Option<OrderModel>, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self))]
    pub async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<OrderModel>, ServiceError> {
        order::Entity::find()
            .filter(order::Column::PaystackReference.eq(reference))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn reload<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<OrderModel, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    fn terminal_conflict(order: &OrderModel, target: &OrderStatus) -> ServiceError {
        warn!(
            order_id = order.id,
            current = %order.order_status(),
            requested = %target,
            "Refusing to change a settled order"
        );
        ServiceError::Conflict(format!(
            "Order {} is already {} and cannot become {}",
            order.id,
            order.order_status(),
            target
        ))
    }
}

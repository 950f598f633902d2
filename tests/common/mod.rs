#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use cds_storefront::{
    config::AppConfig,
    db,
    entities::{customer, order},
    handlers::AppServices,
    services::{GatewayHandle, ReferenceGenerator},
    AppState,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Statement};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const PUBLIC_BASE_URL: &str = "http://shop.test";
pub const TEST_SECRET_KEY: &str = "sk_test_storefront";

/// Knobs for building a [`TestApp`].
pub struct TestOptions {
    pub secret_key: Option<String>,
    pub gateway_timeout_ms: u64,
    pub references: Option<Arc<dyn ReferenceGenerator>>,
    pub public_base_url: Option<String>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            secret_key: Some(TEST_SECRET_KEY.to_string()),
            gateway_timeout_ms: 2_000,
            references: None,
            public_base_url: Some(PUBLIC_BASE_URL.to_string()),
        }
    }
}

/// Always hands out the same reference.
pub struct FixedReferenceGenerator(pub String);

impl ReferenceGenerator for FixedReferenceGenerator {
    fn generate(&self, _network_label: &str, _plan: &str) -> String {
        self.0.clone()
    }
}

/// Application backed by an in-memory SQLite database and a mock Paystack server.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: MockServer,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Self {
        let gateway = MockServer::start().await;

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.public_base_url = options.public_base_url;
        cfg.paystack.secret_key = options.secret_key;
        cfg.paystack.base_url = gateway.uri();
        cfg.paystack.timeout_ms = options.gateway_timeout_ms;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let gateway_handle = GatewayHandle::from_config(&cfg.paystack);
        let services = match options.references {
            Some(references) => AppServices::with_reference_generator(
                db_arc.clone(),
                gateway_handle.clone(),
                &cfg.paystack.currency,
                references,
            ),
            None => AppServices::new(db_arc.clone(), gateway_handle.clone(), &cfg.paystack.currency),
        };

        let state = AppState {
            db: db_arc,
            config: cfg,
            gateway: gateway_handle,
            services,
        };

        Self {
            router: cds_storefront::app_router(state.clone()),
            state,
            gateway,
        }
    }

    /// Send a request against the router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request");
        self.request(request).await
    }

    /// POST an urlencoded form.
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> Response {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("failed to build request");
        self.request(request).await
    }

    /// Form fields of a complete, valid checkout.
    pub fn checkout_fields(email: &str) -> [(&'static str, &str); 5] {
        [
            ("fullname", "Ama Mensah"),
            ("contact", "0241234567"),
            ("email", email),
            ("location", "Greater Accra"),
            ("recipient_phone", "0551234567"),
        ]
    }

    /// Submit the checkout form with a complete, valid set of details.
    pub async fn checkout(&self, network: &str, plan: &str, email: &str) -> Response {
        self.post_form(
            &format!("/checkout/{}/{}", network, plan),
            &Self::checkout_fields(email),
        )
        .await
    }

    /// Mock a successful initialize call returning `authorization_url`.
    pub async fn mock_initialize(&self, authorization_url: &str) {
        Mock::given(method("POST"))
            .and(path("/transaction/initialize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": authorization_url,
                    "access_code": "ac_test",
                    "reference": "ignored"
                }
            })))
            .mount(&self.gateway)
            .await;
    }

    /// Mock a verify call for `reference` answering with the given transaction status.
    pub async fn mock_verify(&self, reference: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/transaction/verify/{}", reference)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Verification successful",
                "data": { "status": status, "reference": reference, "amount": 528 }
            })))
            .mount(&self.gateway)
            .await;
    }

    /// JSON bodies the gateway received on initialize.
    pub async fn initialize_bodies(&self) -> Vec<Value> {
        self.gateway
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == "/transaction/initialize")
            .map(|r| serde_json::from_slice(&r.body).expect("initialize body is json"))
            .collect()
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        let backend = self.state.db.get_database_backend();
        let row = self
            .state
            .db
            .query_one(Statement::from_string(
                backend,
                format!("SELECT COUNT(*) AS count FROM {}", table),
            ))
            .await
            .expect("count query")
            .expect("count row");
        row.try_get::<i64>("", "count").expect("count column")
    }

    pub async fn orders(&self) -> Vec<order::Model> {
        order::Entity::find()
            .order_by_asc(order::Column::Id)
            .all(&*self.state.db)
            .await
            .expect("load orders")
    }

    pub async fn customer_by_email(&self, email: &str) -> Option<customer::Model> {
        customer::Entity::find()
            .filter(customer::Column::Email.eq(email))
            .one(&*self.state.db)
            .await
            .expect("load customer")
    }
}

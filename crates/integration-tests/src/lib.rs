//! Integration tests for the Nutriio storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p nutriio-integration-tests
//! ```
//!
//! No external services are needed. Two kinds of doubles live here:
//!
//! - in-process collaborators ([`InMemoryPersistence`], [`ScriptedGateway`],
//!   [`SecretVerifier`]) that drive the checkout orchestrator directly and
//!   record every call for later assertions
//! - [`FakeBackend`], a local axum server that answers the handful of
//!   Razorpay and PostgREST endpoints the real clients call, used to test the
//!   HTTP surface end to end
//!
//! # Test Categories
//!
//! - `checkout_flow` - orchestrator state machine against in-memory collaborators
//! - `http_api` - router, handlers and real clients against [`FakeBackend`]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use nutriio_core::{
    AddressId, AddressKind, GatewayOrderId, OrderId, OrderNumber, PaymentId, ProductId, UserId,
};
use nutriio_storefront::cart::NewCartItem;
use nutriio_storefront::checkout::{
    CheckoutForm, CheckoutSettings, GatewayError, PaymentGateway, PersistenceError,
    SignatureVerifier, StorePersistence,
};
use nutriio_storefront::config::{CheckoutConfig, RazorpayConfig, StorefrontConfig, SupabaseConfig};
use nutriio_storefront::models::{
    GatewayOrder, GatewayOrderRequest, GatewayOutcome, GatewaySession, NewOrder, NewOrderItem,
    OrderRecord, OrderStatusUpdate, PaymentConfirmation, Profile, SavedAddress,
};
use nutriio_storefront::payments::{expected_signature, verify_payment_signature};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

/// Key secret shared by the gateway doubles and the verifiers.
pub const TEST_KEY_SECRET: &str = "thisIsTheRazorpayKeySecret";
/// Public key id used in test settings.
pub const TEST_KEY_ID: &str = "rzp_test_1DP5mmOlF5G5ag";
/// WhatsApp number used in test settings.
pub const TEST_WHATSAPP_NUMBER: &str = "919000012345";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Fixtures
// =============================================================================

/// Product A from the storefront catalog: ₹210, 250 g.
#[must_use]
pub fn peanut_bar() -> NewCartItem {
    NewCartItem {
        id: ProductId::new("jaggery-peanut-bar"),
        name: "Jaggery Peanut Bar".to_string(),
        price: Decimal::from(210),
        image: "/images/peanut-bar.jpg".to_string(),
        weight: Some("250".to_string()),
    }
}

/// Product B: ₹140, 500 g.
#[must_use]
pub fn ragi_cookies() -> NewCartItem {
    NewCartItem {
        id: ProductId::new("ragi-cookies"),
        name: "Ragi Cookies".to_string(),
        price: Decimal::from(140),
        image: "/images/ragi-cookies.jpg".to_string(),
        weight: Some("500".to_string()),
    }
}

/// A complete manual form delivering to `postal_code`.
#[must_use]
pub fn manual_form(postal_code: &str) -> CheckoutForm {
    CheckoutForm {
        full_name: "Asha Rao".to_string(),
        email: "asha@example.in".to_string(),
        phone: "+91 98765 43210".to_string(),
        address_line_1: "12 MG Road".to_string(),
        address_line_2: String::new(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        postal_code: postal_code.to_string(),
        country: String::new(),
    }
}

/// A saved address row for `user_id`.
#[must_use]
pub fn saved_address(id: &str, user_id: &UserId, postal_code: &str) -> SavedAddress {
    SavedAddress {
        id: AddressId::new(id),
        user_id: user_id.clone(),
        kind: AddressKind::Home,
        full_name: "Vikram Iyer".to_string(),
        phone_number: "9845012345".to_string(),
        address_line_1: "4 Residency Road".to_string(),
        address_line_2: Some("Flat 2B".to_string()),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        postal_code: postal_code.to_string(),
        country: "India".to_string(),
        is_default: true,
    }
}

/// Checkout settings serving only the listed postal codes.
#[must_use]
pub fn settings_serving(pincodes: &[&str]) -> CheckoutSettings {
    let mut settings = CheckoutSettings::new(TEST_KEY_ID, TEST_WHATSAPP_NUMBER);
    settings.serviceable_pincodes = pincodes.iter().map(ToString::to_string).collect();
    settings
}

/// A success payload for `order_id`, signed with [`TEST_KEY_SECRET`].
#[must_use]
pub fn signed_confirmation(order_id: &str, payment_id: &str) -> PaymentConfirmation {
    PaymentConfirmation {
        payment_id: PaymentId::new(payment_id),
        order_id: GatewayOrderId::new(order_id),
        signature: expected_signature(TEST_KEY_SECRET, order_id, payment_id).unwrap_or_default(),
    }
}

// =============================================================================
// InMemoryPersistence
// =============================================================================

/// Persistence operations, in the order the fake saw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceCall {
    ListAddresses,
    Profile,
    GenerateOrderNumber,
    InsertOrder,
    InsertOrderItems,
    UpdateOrderStatus,
}

#[derive(Debug, Default)]
struct Tables {
    addresses: Vec<SavedAddress>,
    profiles: Vec<Profile>,
    orders: Vec<OrderRecord>,
    inserted_orders: Vec<NewOrder>,
    order_items: Vec<NewOrderItem>,
    calls: Vec<PersistenceCall>,
    fail_on: Option<PersistenceCall>,
    sequence: u32,
}

/// Backend double holding rows in memory. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a saved address.
    #[must_use]
    pub fn with_address(self, address: SavedAddress) -> Self {
        lock(&self.tables).addresses.push(address);
        self
    }

    /// Seed a profile.
    #[must_use]
    pub fn with_profile(self, profile: Profile) -> Self {
        lock(&self.tables).profiles.push(profile);
        self
    }

    /// Make `call` fail with an API error.
    #[must_use]
    pub fn failing_on(self, call: PersistenceCall) -> Self {
        lock(&self.tables).fail_on = Some(call);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<PersistenceCall> {
        lock(&self.tables).calls.clone()
    }

    /// Current order rows.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRecord> {
        lock(&self.tables).orders.clone()
    }

    /// Order headers exactly as inserted.
    #[must_use]
    pub fn inserted_orders(&self) -> Vec<NewOrder> {
        lock(&self.tables).inserted_orders.clone()
    }

    #[must_use]
    pub fn order_items(&self) -> Vec<NewOrderItem> {
        lock(&self.tables).order_items.clone()
    }

    fn enter(&self, call: PersistenceCall) -> Result<MutexGuard<'_, Tables>, PersistenceError> {
        let mut tables = lock(&self.tables);
        tables.calls.push(call);
        if tables.fail_on == Some(call) {
            return Err(PersistenceError::Api {
                status: 503,
                message: format!("{call:?} failed"),
            });
        }
        Ok(tables)
    }
}

#[async_trait]
impl StorePersistence for InMemoryPersistence {
    async fn list_addresses(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SavedAddress>, PersistenceError> {
        let tables = self.enter(PersistenceCall::ListAddresses)?;
        Ok(tables
            .addresses
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>, PersistenceError> {
        let tables = self.enter(PersistenceCall::Profile)?;
        Ok(tables.profiles.iter().find(|p| &p.id == user_id).cloned())
    }

    async fn generate_order_number(&self) -> Result<OrderNumber, PersistenceError> {
        let mut tables = self.enter(PersistenceCall::GenerateOrderNumber)?;
        tables.sequence += 1;
        Ok(OrderNumber::new(format!("NUT-{:05}", tables.sequence)))
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, PersistenceError> {
        let mut tables = self.enter(PersistenceCall::InsertOrder)?;
        let record = OrderRecord {
            id: OrderId::new(format!("order-row-{}", tables.orders.len() + 1)),
            order_number: order.order_number.clone(),
            status: order.status,
            payment_status: order.payment_status,
            total_amount: order.total_amount,
            payment_id: None,
        };
        tables.inserted_orders.push(order.clone());
        tables.orders.push(record.clone());
        Ok(record)
    }

    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<(), PersistenceError> {
        let mut tables = self.enter(PersistenceCall::InsertOrderItems)?;
        tables.order_items.extend_from_slice(items);
        Ok(())
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        update: &OrderStatusUpdate,
    ) -> Result<OrderRecord, PersistenceError> {
        let mut tables = self.enter(PersistenceCall::UpdateOrderStatus)?;
        let row = tables
            .orders
            .iter_mut()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| PersistenceError::NotFound(order_id.to_string()))?;
        row.status = update.status;
        row.payment_status = update.payment_status;
        row.payment_id.clone_from(&update.payment_id);
        Ok(row.clone())
    }
}

// =============================================================================
// ScriptedGateway
// =============================================================================

/// How the scripted shopper finishes the hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopperScript {
    /// Pay and return a correctly signed payload for the opened order.
    Pay { payment_id: String },
    /// Pay, but the payload names a different gateway order.
    PayForOtherOrder { order_id: String, payment_id: String },
    /// Pay with a tampered signature.
    PayWithForgedSignature { payment_id: String },
    /// The gateway declines the payment.
    Decline { reason: String },
    /// Close the modal.
    Dismiss,
}

#[derive(Debug, Default)]
struct GatewayLog {
    order_requests: Vec<GatewayOrderRequest>,
    sessions: Vec<GatewaySession>,
}

/// Gateway double that creates sequential orders and plays a script.
#[derive(Debug, Clone)]
pub struct ScriptedGateway {
    script: ShopperScript,
    reject_orders: bool,
    log: Arc<Mutex<GatewayLog>>,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new(script: ShopperScript) -> Self {
        Self {
            script,
            reject_orders: false,
            log: Arc::default(),
        }
    }

    /// Shopper pays successfully with `payment_id`.
    #[must_use]
    pub fn paying(payment_id: &str) -> Self {
        Self::new(ShopperScript::Pay {
            payment_id: payment_id.to_string(),
        })
    }

    /// Order creation fails before any session opens.
    #[must_use]
    pub fn rejecting_orders() -> Self {
        Self {
            reject_orders: true,
            ..Self::new(ShopperScript::Dismiss)
        }
    }

    #[must_use]
    pub fn order_requests(&self) -> Vec<GatewayOrderRequest> {
        lock(&self.log).order_requests.clone()
    }

    #[must_use]
    pub fn sessions(&self) -> Vec<GatewaySession> {
        lock(&self.log).sessions.clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.reject_orders {
            return Err(GatewayError::Api {
                status: 400,
                message: "The api key provided is invalid".to_string(),
            });
        }

        let mut log = lock(&self.log);
        log.order_requests.push(request.clone());
        Ok(GatewayOrder {
            id: GatewayOrderId::new(format!("order_test_{}", log.order_requests.len())),
            amount: request.amount,
            currency: request.currency.code().to_string(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
        })
    }

    async fn open_session(
        &self,
        session: &GatewaySession,
    ) -> Result<GatewayOutcome, GatewayError> {
        lock(&self.log).sessions.push(session.clone());
        let order_ref = session.order_ref.as_str();

        Ok(match &self.script {
            ShopperScript::Pay { payment_id } => {
                GatewayOutcome::Succeeded(signed_confirmation(order_ref, payment_id))
            }
            ShopperScript::PayForOtherOrder {
                order_id,
                payment_id,
            } => GatewayOutcome::Succeeded(signed_confirmation(order_id, payment_id)),
            ShopperScript::PayWithForgedSignature { payment_id } => {
                let mut confirmation = signed_confirmation(order_ref, payment_id);
                confirmation.signature = "0".repeat(64);
                GatewayOutcome::Succeeded(confirmation)
            }
            ShopperScript::Decline { reason } => GatewayOutcome::Failed {
                reason: reason.clone(),
            },
            ShopperScript::Dismiss => GatewayOutcome::Dismissed,
        })
    }
}

// =============================================================================
// Verifiers
// =============================================================================

/// HMAC verifier keyed with a known secret.
#[derive(Debug, Clone)]
pub struct SecretVerifier {
    secret: String,
}

impl SecretVerifier {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }
}

impl Default for SecretVerifier {
    fn default() -> Self {
        Self::new(TEST_KEY_SECRET)
    }
}

#[async_trait]
impl SignatureVerifier for SecretVerifier {
    async fn verify(&self, confirmation: &PaymentConfirmation) -> Result<bool, GatewayError> {
        Ok(verify_payment_signature(
            &self.secret,
            confirmation.order_id.as_str(),
            confirmation.payment_id.as_str(),
            &confirmation.signature,
        ))
    }
}

/// Verifier whose backing service is down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableVerifier;

#[async_trait]
impl SignatureVerifier for UnavailableVerifier {
    async fn verify(&self, _confirmation: &PaymentConfirmation) -> Result<bool, GatewayError> {
        Err(GatewayError::Unavailable("verification service timed out".to_string()))
    }
}

// =============================================================================
// FakeBackend
// =============================================================================

/// One request the fake backend received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Default)]
struct BackendState {
    requests: Mutex<Vec<RecordedRequest>>,
    addresses: Mutex<Vec<Value>>,
    order_numbers: Mutex<VecDeque<String>>,
}

impl BackendState {
    fn record(&self, method: &str, path: &str, body: Value) {
        lock(&self.requests).push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            body,
        });
    }
}

/// Local HTTP server answering Razorpay `/v1/orders` and the PostgREST
/// routes under `/rest/v1`.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    base_url: Url,
    state: Arc<BackendState>,
}

impl FakeBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(BackendState::default());
        lock(&state.order_numbers).push_back("NUT-00042".to_string());

        let app = Router::new()
            .route("/v1/orders", post(razorpay_create_order))
            .route("/rest/v1/addresses", get(postgrest_addresses))
            .route("/rest/v1/profiles", get(postgrest_profiles))
            .route(
                "/rest/v1/rpc/generate_order_number",
                post(postgrest_order_number),
            )
            .route(
                "/rest/v1/orders",
                post(postgrest_insert_order).patch(postgrest_update_order),
            )
            .route("/rest/v1/order_items", post(postgrest_insert_items))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url = Url::parse(&format!("http://{addr}/"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Ok(Self { base_url, state })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Seed a saved address row (JSON as PostgREST returns it).
    pub fn add_address(&self, row: Value) {
        lock(&self.state.addresses).push(row);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Requests whose path starts with `prefix`.
    #[must_use]
    pub fn requests_to(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }

    /// Storefront configuration pointing both clients at this server.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be joined.
    pub fn storefront_config(
        &self,
        serviceable_pincodes: &[&str],
    ) -> Result<StorefrontConfig, url::ParseError> {
        Ok(StorefrontConfig {
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 0,
            supabase: SupabaseConfig {
                url: self.base_url.clone(),
                anon_key: SecretString::from("anon-9f8e7d6c5b4a-public-key"),
            },
            razorpay: RazorpayConfig {
                key_id: TEST_KEY_ID.to_string(),
                key_secret: SecretString::from(TEST_KEY_SECRET),
                api_base: self.base_url.join("v1")?,
            },
            checkout: CheckoutConfig {
                merchant_name: "Nutriio".to_string(),
                whatsapp_number: TEST_WHATSAPP_NUMBER.to_string(),
                serviceable_pincodes: serviceable_pincodes
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                session_ttl: Duration::from_secs(30),
            },
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

type Backend = State<Arc<BackendState>>;

async fn razorpay_create_order(State(state): Backend, Json(body): Json<Value>) -> Json<Value> {
    state.record("POST", "/v1/orders", body.clone());
    let count = lock(&state.requests)
        .iter()
        .filter(|r| r.path == "/v1/orders")
        .count();
    Json(json!({
        "id": format!("order_fake_{count}"),
        "entity": "order",
        "amount": body["amount"],
        "currency": body["currency"],
        "receipt": body["receipt"],
        "status": "created",
    }))
}

async fn postgrest_addresses(State(state): Backend) -> Json<Value> {
    state.record("GET", "/rest/v1/addresses", Value::Null);
    Json(Value::Array(lock(&state.addresses).clone()))
}

async fn postgrest_profiles(State(state): Backend) -> Json<Value> {
    state.record("GET", "/rest/v1/profiles", Value::Null);
    Json(json!([]))
}

async fn postgrest_order_number(State(state): Backend, Json(body): Json<Value>) -> Json<Value> {
    state.record("POST", "/rest/v1/rpc/generate_order_number", body);
    let number = lock(&state.order_numbers)
        .pop_front()
        .unwrap_or_else(|| "NUT-99999".to_string());
    Json(Value::String(number))
}

async fn postgrest_insert_order(
    State(state): Backend,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.record("POST", "/rest/v1/orders", body.clone());
    let order = &body[0];
    (
        StatusCode::CREATED,
        Json(json!([{
            "id": "5b0c7a4e-order-row",
            "order_number": order["order_number"],
            "status": order["status"],
            "payment_status": order["payment_status"],
            "total_amount": order["total_amount"],
        }])),
    )
}

async fn postgrest_insert_items(State(state): Backend, Json(body): Json<Value>) -> StatusCode {
    state.record("POST", "/rest/v1/order_items", body);
    StatusCode::CREATED
}

async fn postgrest_update_order(State(state): Backend, Json(body): Json<Value>) -> Json<Value> {
    state.record("PATCH", "/rest/v1/orders", body.clone());
    let inserted = lock(&state.requests)
        .iter()
        .rev()
        .find(|r| r.method == "POST" && r.path == "/rest/v1/orders")
        .map(|r| r.body[0].clone())
        .unwrap_or(Value::Null);
    Json(json!([{
        "id": "5b0c7a4e-order-row",
        "order_number": inserted["order_number"],
        "status": body["status"],
        "payment_status": body["payment_status"],
        "total_amount": inserted["total_amount"],
        "payment_id": body["payment_id"],
    }]))
}

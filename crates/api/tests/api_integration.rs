//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::config::Config;
use api::session::SESSION_HEADER;
use api::state::{AppState, Backends};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::IdentityId;
use gateway::{
    InMemoryDistributor, InMemoryIdentityProvider, InMemoryPaymentProcessor, METADATA_ORDER_NUMBERS,
    SIGNATURE_HEADER, WebhookEventKind,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestHarness {
    app: axum::Router,
    distributor: InMemoryDistributor,
    payments: InMemoryPaymentProcessor,
    identity: InMemoryIdentityProvider,
    session: String,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let distributor = InMemoryDistributor::new();
        let payments = InMemoryPaymentProcessor::new("whsec_test");
        let identity = InMemoryIdentityProvider::new();
        let backends = Backends {
            distributor: Arc::new(distributor.clone()),
            payments: Arc::new(payments.clone()),
            identity: Arc::new(identity.clone()),
        };
        let state: Arc<AppState> = AppState::new(&config, backends);
        Self {
            app: api::create_app(state, get_metrics_handle()),
            distributor,
            payments,
            identity,
            session: "test-session-1".to_string(),
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(None, method, uri, body).await
    }

    /// Sends a request carrying `token` as a bearer access token.
    async fn send_as(
        &self,
        token: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(SESSION_HEADER, &self.session);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn deliver(&self, body: Vec<u8>, signature: &str) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/payment")
                    .header("content-type", "application/json")
                    .header(SIGNATURE_HEADER, signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn add_item(&self, sku: &str, price_cents: i64, quantity: u32) -> Value {
        let (status, cart) = self
            .send(
                "POST",
                "/cart/items",
                Some(json!({
                    "catalog_item_id": format!("cat-{sku}"),
                    "sku": sku,
                    "name": format!("Item {sku}"),
                    "unit_price": price_cents,
                    "quantity": quantity,
                    "weight": 1.5,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{cart}");
        cart
    }

    async fn set_address(&self) {
        let (status, body) = self
            .send(
                "PUT",
                "/cart/address",
                Some(json!({
                    "name": "Ada Lovelace",
                    "street1": "12 Analytical Way",
                    "city": "Austin",
                    "state": "TX",
                    "zip": "78701",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Fills the cart, sets the address and picks the cheapest rate.
    async fn ready_cart(&self) {
        self.add_item("SKU-1", 2500, 2).await;
        self.set_address().await;
        let (_, rates) = self
            .send(
                "POST",
                "/shipping/rates",
                Some(json!({
                    "shipping_address": { "name": "Ada Lovelace", "street1": "12 Analytical Way",
                        "city": "Austin", "state": "TX", "zip": "78701" },
                    "subtotal": 5000,
                    "weight": 3.0,
                })),
            )
            .await;
        let rate_id = rates[0]["id"].as_str().unwrap().to_string();
        let (status, body) = self
            .send(
                "PUT",
                "/cart/shipping-rate",
                Some(json!({ "rate_id": rate_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
}

#[tokio::test]
async fn test_health_check() {
    let harness = TestHarness::new();
    let (status, json) = harness.send("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["order_test_mode"], false);
}

#[tokio::test]
async fn test_new_session_is_issued_when_header_missing() {
    let harness = TestHarness::new();
    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let issued = response.headers().get(SESSION_HEADER).unwrap();
    assert!(!issued.to_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_survives_between_requests() {
    let harness = TestHarness::new();
    harness.add_item("SKU-1", 1000, 1).await;
    harness.add_item("SKU-1", 1000, 2).await;
    harness.add_item("SKU-2", 450, 1).await;

    let (status, cart) = harness.send("GET", "/cart", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["session"], "test-session-1");
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart["item_count"], 4);
    assert_eq!(cart["totals"]["subtotal"], 3450);
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let harness = TestHarness::new();
    harness.add_item("SKU-1", 1000, 1).await;
    harness.add_item("SKU-2", 500, 1).await;

    let (status, cart) = harness
        .send("PATCH", "/cart/items/cat-SKU-1", Some(json!({ "quantity": 5 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 6);

    let (status, cart) = harness.send("DELETE", "/cart/items/cat-SKU-2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);

    let (status, _) = harness.send("DELETE", "/cart/items/cat-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_zero_quantity_add_is_rejected() {
    let harness = TestHarness::new();
    let (status, _) = harness
        .send(
            "POST",
            "/cart/items",
            Some(json!({
                "catalog_item_id": "cat-1",
                "sku": "SKU-1",
                "name": "Item",
                "unit_price": 100,
                "quantity": 0,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incomplete_address_reports_fields() {
    let harness = TestHarness::new();
    let (status, body) = harness
        .send(
            "PUT",
            "/cart/address",
            Some(json!({ "name": "", "street1": "", "city": "", "state": "Texas", "zip": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"shipping_address.zip"));
    assert!(fields.contains(&"shipping_address.state"));
}

#[tokio::test]
async fn test_rate_selection_requires_offered_rate() {
    let harness = TestHarness::new();
    harness.add_item("SKU-1", 1000, 1).await;

    let (status, _) = harness
        .send("PUT", "/cart/shipping-rate", Some(json!({ "rate_id": "ground" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    harness.set_address().await;
    let (status, _) = harness
        .send("PUT", "/cart/shipping-rate", Some(json!({ "rate_id": "teleport" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shipping_quote_is_sorted_by_price() {
    let harness = TestHarness::new();
    let (status, rates) = harness
        .send(
            "POST",
            "/shipping/rates",
            Some(json!({
                "shipping_address": { "name": "A", "street1": "1 Main", "city": "Boston",
                    "state": "MA", "zip": "02101" },
                "subtotal": 2000,
                "weight": 2.0,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let prices: Vec<i64> = rates
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rate"].as_i64().unwrap())
        .collect();
    assert!(prices.len() >= 2);
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_shipping_quote_missing_zip_is_bad_request() {
    let harness = TestHarness::new();
    let (status, _) = harness
        .send(
            "POST",
            "/shipping/rates",
            Some(json!({
                "shipping_address": { "name": "A", "street1": "1 Main", "city": "Boston",
                    "state": "MA", "zip": "" },
                "subtotal": 2000,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_creates_order_and_empties_cart() {
    let harness = TestHarness::new();
    harness.ready_cart().await;

    let (status, receipt) = harness
        .send("POST", "/checkout", Some(json!({ "email": "ada@example.com" })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["test_mode"], false);
    assert_eq!(harness.distributor.order_count(), 1);

    let po_number = receipt["po_number"].as_str().unwrap().to_string();
    let (status, order) = harness
        .send("GET", &format!("/orders/{po_number}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["external_order_number"], receipt["external_order_number"]);

    let (status, submission) = harness
        .send("GET", &format!("/orders/{po_number}/submission"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submission["state"], "OrderCreated");

    let (_, cart) = harness.send("GET", "/cart", None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_checkout_of_empty_cart_is_unprocessable() {
    let harness = TestHarness::new();
    harness.set_address().await;

    let (status, body) = harness.send("POST", "/checkout", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "items");
    assert_eq!(harness.distributor.calls().len(), 0);
}

#[tokio::test]
async fn test_distributor_failure_keeps_cart() {
    let harness = TestHarness::new();
    harness.ready_cart().await;
    harness.distributor.set_fail_on_create_order(true);

    let (status, body) = harness.send("POST", "/checkout", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Order could not be submitted, no charge was made");
    assert!(body["po_number"].is_string());

    let (_, cart) = harness.send("GET", "/cart", None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_test_mode_skips_distributor() {
    let harness = TestHarness::with_config(Config {
        order_test_mode: true,
        ..Default::default()
    });
    harness.ready_cart().await;

    let (status, receipt) = harness.send("POST", "/checkout", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["test_mode"], true);
    assert!(
        receipt["external_order_number"]
            .as_str()
            .unwrap()
            .starts_with("TEST-")
    );
    assert!(harness.distributor.calls().is_empty());
}

#[tokio::test]
async fn test_paid_checkout_is_reconciled_once() {
    let harness = TestHarness::new();
    harness.ready_cart().await;
    let token = harness.identity.issue_token(&IdentityId::new("user_1"));
    let (status, bound) = harness
        .send_as(Some(&token), "POST", "/cart/identity", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bound["outcome"], "adopted");

    let (status, intent) = harness
        .send("POST", "/checkout/payment-intent", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{intent}");
    let intent_id = intent["id"].as_str().unwrap().to_string();
    assert!(intent["amount"].as_i64().unwrap() > 5000);
    assert_eq!(harness.distributor.order_count(), 0);

    let (body, signature) = harness
        .payments
        .emit_event(WebhookEventKind::PaymentSucceeded, &intent_id)
        .unwrap();

    let (status, ack) = harness.deliver(body.clone(), &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "order_created");
    let po_number = ack["po_number"].as_str().unwrap().to_string();

    let (status, ack) = harness.deliver(body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "duplicate");
    assert_eq!(harness.distributor.order_count(), 1);

    let history = harness
        .identity
        .metadata(&IdentityId::new("user_1"), METADATA_ORDER_NUMBERS)
        .unwrap();
    assert_eq!(history, json!([po_number]));

    let (status, payment) = harness
        .send("GET", &format!("/checkout/payment-intent/{intent_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "succeeded");
}

#[tokio::test]
async fn test_identity_binding_requires_a_valid_token() {
    let harness = TestHarness::new();
    let victim = IdentityId::new("user_1");
    harness.identity.set_metadata(
        &victim,
        gateway::METADATA_CART,
        json!([{
            "catalog_item_id": "cat-SECRET",
            "sku": "SECRET",
            "name": "Stored item",
            "unit_price": 4200,
            "quantity": 1
        }]),
    );
    harness.add_item("A", 1000, 1).await;

    let (status, json) = harness
        .send("POST", "/cart/identity", Some(json!({ "identity_id": "user_1" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "authentication required");

    let (status, _) = harness
        .send_as(Some("tok_forged"), "POST", "/cart/identity", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, cart) = harness.send("GET", "/cart", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["owner"], Value::Null);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(harness.identity.get_count(), 0);
}

#[tokio::test]
async fn test_webhook_with_bad_signature_is_rejected() {
    let harness = TestHarness::new();
    harness.ready_cart().await;
    let (_, intent) = harness
        .send("POST", "/checkout/payment-intent", Some(json!({})))
        .await;
    let (body, _) = harness
        .payments
        .emit_event(
            WebhookEventKind::PaymentSucceeded,
            intent["id"].as_str().unwrap(),
        )
        .unwrap();

    let (status, json) = harness.deliver(body, "t=1,v1=deadbeef").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid signature");
    assert_eq!(harness.distributor.order_count(), 0);
}

#[tokio::test]
async fn test_failed_payment_is_acknowledged_without_order() {
    let harness = TestHarness::new();
    harness.ready_cart().await;
    let (_, intent) = harness
        .send("POST", "/checkout/payment-intent", Some(json!({})))
        .await;
    let (body, signature) = harness
        .payments
        .emit_event(WebhookEventKind::PaymentFailed, intent["id"].as_str().unwrap())
        .unwrap();

    let (status, ack) = harness.deliver(body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "ignored");
    assert_eq!(harness.distributor.order_count(), 0);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let harness = TestHarness::new();
    let (status, _) = harness.send("GET", "/orders/WEB-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = harness
        .send("GET", "/orders/WEB-missing/submission", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let harness = TestHarness::new();
    harness.ready_cart().await;
    harness.send("POST", "/checkout", Some(json!({}))).await;

    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkouts_total"));
}

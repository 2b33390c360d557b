//! HttpDistributorClient against a local axum stand-in for the distributor.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::{Money, PoNumber, ShippingAddress};
use gateway::{
    DistributorApi, DistributorCart, DistributorLineItem, GatewayError, HttpDistributorClient,
};
use secrecy::SecretString;
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl Recorded {
    fn push(&self, what: String, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((what, auth));
    }
}

async fn create_cart(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let po = body["po_number"].as_str().unwrap_or_default().to_string();
    rec.push(format!("create_cart {po}"), &headers);
    if po == "DUP" {
        return (StatusCode::CONFLICT, Json(json!({"error": "exists"})));
    }
    (StatusCode::CREATED, Json(json!({"id": po})))
}

async fn add_item(
    State(rec): State<Recorded>,
    Path(po): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    rec.push(format!("add_item {po} {}", body["sku"]), &headers);
    StatusCode::NO_CONTENT
}

async fn create_order(
    State(rec): State<Recorded>,
    Path(po): Path<String>,
    headers: HeaderMap,
) -> Json<Value> {
    rec.push(format!("create_order {po}"), &headers);
    Json(json!({"order_number": "SO-42", "status": "submitted", "total": 1999}))
}

async fn delete_cart(
    State(rec): State<Recorded>,
    Path(po): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    rec.push(format!("delete_cart {po}"), &headers);
    StatusCode::NO_CONTENT
}

async fn get_order(Path(po): Path<String>) -> (StatusCode, String) {
    match po.as_str() {
        "KNOWN" => (
            StatusCode::OK,
            json!({"po_number": "KNOWN", "external_order_number": "SO-1", "status": "shipped", "total": 500})
                .to_string(),
        ),
        "GARBLED" => (StatusCode::OK, "{\"status\": 3".to_string()),
        _ => (StatusCode::NOT_FOUND, "no such order".to_string()),
    }
}

async fn spawn_distributor() -> (String, Recorded) {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/carts", post(create_cart))
        .route("/carts/{po}/items", post(add_item))
        .route("/carts/{po}/order", post(create_order))
        .route("/carts/{po}", delete(delete_cart))
        .route("/orders/{po}", get(get_order))
        .with_state(rec.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), rec)
}

fn client(base_url: &str) -> HttpDistributorClient {
    HttpDistributorClient::new(base_url, SecretString::from("dist_key".to_string())).unwrap()
}

fn cart(po: &str) -> DistributorCart {
    DistributorCart {
        po_number: PoNumber::new(po),
        warehouse: "main".into(),
        payment_type: "credit_card".into(),
        ship_to: ShippingAddress::default(),
        customer_email: None,
        shipping_service: Some("regional-ground".into()),
    }
}

#[tokio::test]
async fn full_cart_flow_uses_bearer_auth() {
    let (base_url, rec) = spawn_distributor().await;
    let client = client(&base_url);
    let po = PoNumber::new("WEB-1");

    let created = client.create_cart(&cart("WEB-1")).await.unwrap();
    assert_eq!(created.id, "WEB-1");
    client
        .add_item(
            &po,
            &DistributorLineItem {
                sku: "A-1".into(),
                quantity: 2,
                notes: None,
            },
        )
        .await
        .unwrap();
    let order = client.create_order(&po).await.unwrap();
    assert_eq!(order.order_number, "SO-42");
    assert_eq!(order.total, Money::from_cents(1999));
    client.delete_cart(&po).await.unwrap();

    let requests = rec.requests.lock().unwrap().clone();
    let names: Vec<_> = requests.iter().map(|(what, _)| what.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "create_cart WEB-1",
            "add_item WEB-1 \"A-1\"",
            "create_order WEB-1",
            "delete_cart WEB-1"
        ]
    );
    assert!(
        requests
            .iter()
            .all(|(_, auth)| auth.as_deref() == Some("Bearer dist_key"))
    );
}

#[tokio::test]
async fn non_success_status_maps_to_http_error() {
    let (base_url, _) = spawn_distributor().await;
    let err = client(&base_url).create_cart(&cart("DUP")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Http { status: 409, .. }));
}

#[tokio::test]
async fn get_order_outcomes() {
    let (base_url, _) = spawn_distributor().await;
    let client = client(&base_url);

    let record = client.get_order(&PoNumber::new("KNOWN")).await.unwrap();
    assert_eq!(record.status, "shipped");
    assert_eq!(record.external_order_number.as_deref(), Some("SO-1"));

    let missing = client.get_order(&PoNumber::new("MISSING")).await.unwrap_err();
    assert!(matches!(missing, GatewayError::NotFound { .. }));

    let garbled = client.get_order(&PoNumber::new("GARBLED")).await.unwrap_err();
    assert!(matches!(garbled, GatewayError::Decode { .. }));
}

#[tokio::test]
async fn unreachable_distributor_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .get_order(&PoNumber::new("X"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport { .. }));
}

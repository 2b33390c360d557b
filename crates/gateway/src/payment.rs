//! Payment processor contract and webhook event model.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::Money;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignatureError};

/// A payment intent created at checkout.
///
/// `metadata` carries the order description the reconciler rebuilds the
/// order from once the payment is captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: Money,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

/// Lifecycle status of a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

/// Kind of a delivered webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookEventKind {
    /// Funds captured.
    PaymentSucceeded,
    PaymentFailed,
    DisputeCreated,
    /// Any event type the engine does not act on.
    Other(String),
}

impl WebhookEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventKind::PaymentSucceeded => "payment_succeeded",
            WebhookEventKind::PaymentFailed => "payment_failed",
            WebhookEventKind::DisputeCreated => "dispute_created",
            WebhookEventKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for WebhookEventKind {
    fn from(kind: &str) -> Self {
        match kind {
            "payment_succeeded" => WebhookEventKind::PaymentSucceeded,
            "payment_failed" => WebhookEventKind::PaymentFailed,
            "dispute_created" => WebhookEventKind::DisputeCreated,
            other => WebhookEventKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for WebhookEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The payment intent embedded in a webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPaymentIntent {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: WebhookPaymentIntent,
}

/// A verified webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Processor-assigned event id. Redeliveries reuse it.
    pub id: String,
    pub kind: WebhookEventKind,
    pub payment_intent: WebhookPaymentIntent,
}

impl WebhookEvent {
    /// Parses a raw webhook body.
    pub fn from_json(payload: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let wire: WireEvent = serde_json::from_slice(payload)?;
        Ok(Self {
            id: wire.id,
            kind: WebhookEventKind::from(wire.kind.as_str()),
            payment_intent: wire.data,
        })
    }

    /// Serializes the event into its wire form.
    pub fn to_json(&self) -> Vec<u8> {
        let wire = WireEvent {
            id: self.id.clone(),
            kind: self.kind.as_str().to_string(),
            data: self.payment_intent.clone(),
        };
        serde_json::to_vec(&wire).unwrap_or_default()
    }
}

/// Operations against the payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a payment intent carrying the order description as metadata.
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent>;

    /// Returns the current status of a payment intent.
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntentStatus>;

    /// Verifies a webhook signature over the raw body and parses the event.
    ///
    /// Nothing in the payload may be trusted before this succeeds.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> std::result::Result<WebhookEvent, SignatureError>;
}

#[async_trait]
impl<T: PaymentProcessor + ?Sized> PaymentProcessor for Arc<T> {
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent> {
        (**self)
            .create_payment_intent(amount, currency, metadata)
            .await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntentStatus> {
        (**self).retrieve_payment_intent(id).await
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> std::result::Result<WebhookEvent, SignatureError> {
        (**self).verify_webhook(payload, signature_header)
    }
}

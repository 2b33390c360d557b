//! In-memory payment processor.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Money;
use secrecy::SecretString;

use crate::error::{GatewayError, Result, Service, SignatureError};
use crate::payment::{
    PaymentIntent, PaymentIntentStatus, PaymentProcessor, WebhookEvent, WebhookEventKind,
    WebhookPaymentIntent,
};
use crate::signature::WebhookSigner;

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    intents: HashMap<String, (PaymentIntent, PaymentIntentStatus)>,
    next_intent: u32,
    next_event: u32,
    fail_on_create: bool,
}

/// In-memory payment processor for testing.
///
/// Signs the webhook events it emits with the same [`WebhookSigner`] it
/// verifies with, so tests exercise the real signature path.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentProcessor {
    state: Arc<RwLock<InMemoryPaymentState>>,
    signer: WebhookSigner,
}

impl InMemoryPaymentProcessor {
    /// Creates a processor sharing `webhook_secret` with the webhook receiver.
    pub fn new(webhook_secret: &str) -> Self {
        Self::with_signer(WebhookSigner::new(SecretString::from(
            webhook_secret.to_string(),
        )))
    }

    pub fn with_signer(signer: WebhookSigner) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryPaymentState::default())),
            signer,
        }
    }

    pub fn signer(&self) -> &WebhookSigner {
        &self.signer
    }

    /// Configures create_payment_intent to fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Forces the status of an existing intent.
    pub fn set_status(&self, id: &str, status: PaymentIntentStatus) {
        if let Some(entry) = self.state.write().unwrap().intents.get_mut(id) {
            entry.1 = status;
        }
    }

    /// Returns a stored intent.
    pub fn intent(&self, id: &str) -> Option<PaymentIntent> {
        self.state
            .read()
            .unwrap()
            .intents
            .get(id)
            .map(|(intent, _)| intent.clone())
    }

    /// Builds a signed webhook for an existing intent with a fresh event id.
    ///
    /// Returns the raw body and the signature header. Succeeded events also
    /// mark the intent succeeded.
    pub fn emit_event(&self, kind: WebhookEventKind, intent_id: &str) -> Option<(Vec<u8>, String)> {
        let mut state = self.state.write().unwrap();
        let (intent, status) = state.intents.get_mut(intent_id)?;
        if kind == WebhookEventKind::PaymentSucceeded {
            *status = PaymentIntentStatus::Succeeded;
        }
        let payment_intent = WebhookPaymentIntent {
            id: intent.id.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            metadata: intent.metadata.clone(),
        };
        state.next_event += 1;
        let event = WebhookEvent {
            id: format!("evt_{:04}", state.next_event),
            kind,
            payment_intent,
        };
        let body = event.to_json();
        let header = self.signer.sign(&body);
        Some((body, header))
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::http(Service::Payment, 402, "card declined"));
        }

        state.next_intent += 1;
        let id = format!("pi_{:04}", state.next_intent);
        let intent = PaymentIntent {
            client_secret: format!("{id}_secret_{}", uuid::Uuid::new_v4().simple()),
            id: id.clone(),
            amount,
            currency: currency.to_string(),
            metadata,
        };
        state.intents.insert(
            id,
            (intent.clone(), PaymentIntentStatus::RequiresPaymentMethod),
        );
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntentStatus> {
        self.state
            .read()
            .unwrap()
            .intents
            .get(id)
            .map(|(_, status)| *status)
            .ok_or_else(|| GatewayError::NotFound {
                service: Service::Payment,
                resource: format!("payment_intents/{id}"),
            })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> std::result::Result<WebhookEvent, SignatureError> {
        self.signer.verify(payload, signature_header)?;
        WebhookEvent::from_json(payload).map_err(|e| SignatureError::MalformedPayload(e.to_string()))
    }
}

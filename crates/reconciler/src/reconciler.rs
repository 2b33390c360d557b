//! Payment webhook reconciliation.

use std::sync::Arc;

use chrono::Duration;
use common::{IdentityId, Money, PoNumber, TtlStore};
use fulfillment::{
    CheckoutRequest, Customer, OrderLine, OrderSubmission, OrderSubmissionOrchestrator,
    SubmissionReceipt,
};
use gateway::{
    DistributorApi, IdentityProvider, PaymentIntent, PaymentIntentStatus, PaymentProcessor,
    WebhookEvent, WebhookEventKind, METADATA_ORDER_NUMBERS,
};
use serde_json::{Map, Value};
use shipping::ShippingRate;
use tracing::Instrument;

use crate::error::{ReconcileError, ReconciliationGap, Result};
use crate::idempotency::{Claim, EventLedger, EventRecord};
use crate::metadata::{self, OrderMetadata, ParsedOrderMetadata, SelectedRate};

/// Extra write attempts when a concurrent update drops our poNumber.
const ASSOCIATION_RETRIES: usize = 1;

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How long processed webhook event ids are remembered.
    pub idempotency_ttl: Duration,
    /// How long an in-flight claim blocks redeliveries. Must exceed the
    /// longest create-cart, add-items, create-order run.
    pub claim_lease: Duration,
    pub currency: String,
    /// Sales tax in basis points, charged on the item subtotal.
    pub tax_rate_bps: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl: Duration::days(7),
            claim_lease: Duration::minutes(5),
            currency: "usd".to_string(),
            tax_rate_bps: 0,
        }
    }
}

/// How a poNumber ended up in the payer's order history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Added,
    AlreadyPresent,
    /// Guest checkout; there is no history to write to.
    Guest,
}

/// What handling a verified webhook event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This delivery created the order.
    OrderCreated {
        po_number: PoNumber,
        external_order_number: String,
        association: Association,
    },
    /// The event was already reconciled; only the association was re-run.
    Duplicate {
        po_number: PoNumber,
        association: Association,
    },
    /// Another delivery of the same event is still being processed.
    InFlight,
    /// The event kind needs no order.
    Ignored(WebhookEventKind),
    Gap(ReconciliationGap),
}

/// Drives order creation from captured payments.
///
/// Webhook delivery is at-least-once. Each event id is claimed before the
/// distributor is called, so redeliveries never create a second order, and
/// the poNumber is added to the payer's history as a set union.
pub struct PaymentReconciler<D, P, I>
where
    D: DistributorApi,
    P: PaymentProcessor,
    I: IdentityProvider,
{
    orchestrator: Arc<OrderSubmissionOrchestrator<D>>,
    payments: P,
    identity: I,
    ledger: EventLedger,
    config: ReconcilerConfig,
}

impl<D, P, I> PaymentReconciler<D, P, I>
where
    D: DistributorApi,
    P: PaymentProcessor,
    I: IdentityProvider,
{
    /// Creates a reconciler with an in-memory event ledger.
    pub fn new(
        orchestrator: Arc<OrderSubmissionOrchestrator<D>>,
        payments: P,
        identity: I,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            orchestrator,
            payments,
            identity,
            ledger: EventLedger::in_memory(config.claim_lease, config.idempotency_ttl),
            config,
        }
    }

    pub fn with_event_store(mut self, store: Arc<dyn TtlStore<EventRecord>>) -> Self {
        self.ledger = EventLedger::new(
            store,
            self.config.claim_lease,
            self.config.idempotency_ttl,
        );
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Starts the asynchronous checkout: validates the request and creates a
    /// payment intent whose metadata describes the order.
    #[tracing::instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn create_payment_intent(&self, request: &CheckoutRequest) -> Result<PaymentIntent> {
        self.orchestrator.validate(request)?;

        let subtotal: Money = request.items.iter().map(OrderLine::line_total).sum();
        let shipping = request
            .shipping_rate
            .as_ref()
            .map(|rate| rate.rate)
            .unwrap_or_default();
        let amount = subtotal + shipping + subtotal.percent_bps(self.config.tax_rate_bps);

        let mut address = request.shipping_address.clone();
        if address.email.is_none() {
            address.email = request.customer.email.clone();
        }
        let metadata = metadata::encode_order_metadata(
            &request.items,
            &address,
            request.customer.identity_id.as_ref(),
            request.shipping_rate.as_ref(),
        );

        let intent = self
            .payments
            .create_payment_intent(amount, &self.config.currency, metadata)
            .await?;
        tracing::info!(intent_id = %intent.id, %amount, "Payment intent created");
        Ok(intent)
    }

    pub async fn payment_status(&self, intent_id: &str) -> Result<PaymentIntentStatus> {
        Ok(self.payments.retrieve_payment_intent(intent_id).await?)
    }

    /// Handles a verified event.
    #[tracing::instrument(skip_all, fields(event_id = %event.id, kind = %event.kind))]
    pub async fn reconcile(&self, event: &WebhookEvent) -> ReconcileOutcome {
        match &event.kind {
            WebhookEventKind::PaymentSucceeded => self.on_payment_succeeded(event).await,
            WebhookEventKind::PaymentFailed => {
                tracing::warn!(intent_id = %event.payment_intent.id, "Payment failed");
                ReconcileOutcome::Ignored(event.kind.clone())
            }
            WebhookEventKind::DisputeCreated => {
                tracing::error!(
                    target: "ops",
                    intent_id = %event.payment_intent.id,
                    amount = %event.payment_intent.amount,
                    "Payment disputed"
                );
                ReconcileOutcome::Ignored(event.kind.clone())
            }
            WebhookEventKind::Other(_) => {
                tracing::debug!("Unhandled webhook event");
                ReconcileOutcome::Ignored(event.kind.clone())
            }
        }
    }

    async fn on_payment_succeeded(&self, event: &WebhookEvent) -> ReconcileOutcome {
        let intent_id = &event.payment_intent.id;
        let order = match metadata::parse_order_metadata(&event.payment_intent.metadata) {
            ParsedOrderMetadata::Valid(order) => order,
            ParsedOrderMetadata::Invalid(reason) => {
                return self.gap(ReconciliationGap::InvalidMetadata {
                    payment_intent: intent_id.clone(),
                    reason,
                });
            }
        };

        match self.ledger.claim(&event.id).await {
            Claim::Acquired => {}
            Claim::InFlight => {
                tracing::info!("Event already being reconciled by another delivery");
                return ReconcileOutcome::InFlight;
            }
            Claim::Completed(po_number) => {
                tracing::info!(%po_number, "Event already reconciled");
                return match self.associate(order.identity_id.as_ref(), &po_number).await {
                    Ok(association) => ReconcileOutcome::Duplicate {
                        po_number,
                        association,
                    },
                    Err(gap) => self.gap(gap),
                };
            }
        }

        let identity_id = order.identity_id.clone();
        let receipt = match self.create_order(intent_id, order).await {
            Ok(receipt) => receipt,
            Err(reason) => {
                self.ledger.release(&event.id).await;
                return self.gap(ReconciliationGap::OrderNotCreated {
                    payment_intent: intent_id.clone(),
                    reason,
                });
            }
        };
        self.ledger.complete(&event.id, &receipt.po_number).await;

        match self.associate(identity_id.as_ref(), &receipt.po_number).await {
            Ok(association) => ReconcileOutcome::OrderCreated {
                po_number: receipt.po_number,
                external_order_number: receipt.external_order_number,
                association,
            },
            Err(gap) => self.gap(gap),
        }
    }

    async fn create_order(
        &self,
        intent_id: &str,
        order: OrderMetadata,
    ) -> std::result::Result<SubmissionReceipt, String> {
        let shipping_rate = match &order.shipping_rate {
            Some(selected) => Some(self.resolve_rate(&order, selected)?),
            None => None,
        };
        let po_number = self
            .orchestrator
            .issue_po_number()
            .await
            .map_err(|e| e.to_string())?;
        let submission = OrderSubmission {
            po_number,
            customer: Customer {
                email: order.shipping_address.email.clone(),
                identity_id: order.identity_id,
            },
            shipping_address: order.shipping_address,
            items: order.items,
            shipping_rate,
            payment_reference: Some(intent_id.to_string()),
        };
        self.orchestrator
            .place_order(&submission)
            .await
            .map_err(|e| e.to_string())
    }

    /// Finds the charged rate among the rates currently offered for the
    /// order. The id and price must both match.
    fn resolve_rate(
        &self,
        order: &OrderMetadata,
        selected: &SelectedRate,
    ) -> std::result::Result<ShippingRate, String> {
        let subtotal = order.items.iter().map(OrderLine::line_total).sum();
        let weight = order.items.iter().map(OrderLine::line_weight).sum();
        let rates = self
            .orchestrator
            .calculator()
            .calculate(&order.shipping_address, subtotal, weight)
            .map_err(|e| e.to_string())?;
        rates
            .into_iter()
            .find(|rate| selected.is(rate))
            .ok_or_else(|| {
                format!(
                    "charged shipping rate {} at {} is no longer offered",
                    selected.id, selected.price
                )
            })
    }

    async fn associate(
        &self,
        identity_id: Option<&IdentityId>,
        po_number: &PoNumber,
    ) -> std::result::Result<Association, ReconciliationGap> {
        let Some(identity_id) = identity_id else {
            return Ok(Association::Guest);
        };

        match self.append_order_number(identity_id, po_number).await {
            Ok(association) => {
                if association == Association::Added {
                    metrics::counter!("orders_associated_total").increment(1);
                }
                tracing::info!(%po_number, %identity_id, ?association, "Order associated");
                Ok(association)
            }
            Err(e) => Err(ReconciliationGap::AssociationFailed {
                po_number: po_number.clone(),
                identity_id: identity_id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Adds `po_number` to the identity's order numbers as a set union.
    ///
    /// The provider merges top-level keys only, so the whole list is written
    /// back. It is re-read right before every write and read back after it;
    /// a concurrent writer that dropped our entry gets one more attempt.
    async fn append_order_number(
        &self,
        identity_id: &IdentityId,
        po_number: &PoNumber,
    ) -> gateway::Result<Association> {
        let mut written = false;
        for _ in 0..=ASSOCIATION_RETRIES {
            let mut numbers = self.identity.get_user(identity_id).await?.order_numbers();
            if numbers.iter().any(|n| n == po_number.as_str()) {
                return Ok(if written {
                    Association::Added
                } else {
                    Association::AlreadyPresent
                });
            }

            numbers.push(po_number.to_string());
            let mut patch = Map::new();
            patch.insert(METADATA_ORDER_NUMBERS.to_string(), Value::from(numbers));
            self.identity
                .update_user_metadata(identity_id, patch)
                .await?;
            written = true;
        }
        Ok(Association::Added)
    }

    fn gap(&self, gap: ReconciliationGap) -> ReconcileOutcome {
        metrics::counter!("reconciliation_gaps_total", "kind" => gap.kind()).increment(1);
        tracing::error!(target: "ops", error = %gap, "Reconciliation gap");
        ReconcileOutcome::Gap(gap)
    }
}

impl<D, P, I> PaymentReconciler<D, P, I>
where
    D: DistributorApi + 'static,
    P: PaymentProcessor + 'static,
    I: IdentityProvider + 'static,
{
    /// Verifies and handles a raw webhook delivery.
    ///
    /// Only an unverifiable delivery is an error. Everything after
    /// verification is reported through the outcome so the processor gets an
    /// acknowledgement and the payer never sees a failure.
    ///
    /// Reconciliation runs on its own task: if the caller is dropped (the
    /// processor hung up) the order is still created and the claim on the
    /// event is still completed or released.
    #[tracing::instrument(skip_all, fields(bytes = payload.len()))]
    pub async fn handle_webhook(
        self: &Arc<Self>,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ReconcileOutcome> {
        metrics::counter!("webhooks_received_total").increment(1);

        let event = match self.payments.verify_webhook(payload, signature_header) {
            Ok(event) => event,
            Err(e) => {
                metrics::counter!("webhooks_rejected_total").increment(1);
                tracing::warn!(error = %e, "Webhook rejected");
                return Err(e.into());
            }
        };

        let reconciler = Arc::clone(self);
        tokio::spawn(async move { reconciler.reconcile(&event).await }.in_current_span())
            .await
            .map_err(|e| {
                tracing::error!(target: "ops", error = %e, "Webhook reconciliation aborted");
                ReconcileError::Aborted(e.to_string())
            })
    }
}

//! Order submission orchestrator.

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use common::{InMemoryTtlStore, PoNumber, SharedClock, SystemClock, TtlStore};
use gateway::{DistributorApi, DistributorCart, DistributorLineItem, GatewayError};
use shipping::ShippingRateCalculator;

use crate::error::{CleanupFailed, Result, SubmissionError};
use crate::events::{SubmissionEvent, SubmissionStep};
use crate::order::{CheckoutRequest, OrderSubmission, SubmissionReceipt};
use crate::po_number::PoNumberGenerator;
use crate::submission::Submission;
use crate::validation::{self, ValidationErrors};

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub warehouse: String,
    pub payment_type: String,
    /// Skip every distributor call and fabricate the order number.
    /// Never on by default.
    pub test_mode: bool,
    /// How long issued poNumbers are remembered for collision checks.
    pub po_registry_ttl: Duration,
    /// How long finished submissions stay queryable.
    pub submission_log_ttl: Duration,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            warehouse: "main".to_string(),
            payment_type: "credit_card".to_string(),
            test_mode: false,
            po_registry_ttl: Duration::days(30),
            submission_log_ttl: Duration::days(30),
        }
    }
}

/// Submits orders to the distributor.
///
/// One submission runs its steps strictly in sequence against a single
/// poNumber: create cart, add every line, create order. `create_order` is
/// only reached once the cart exists and every line was added. A failure
/// after the cart exists triggers exactly one compensating `delete_cart`.
///
/// Submissions are not idempotent: submitting the same checkout twice
/// produces two poNumbers and two external carts.
pub struct OrderSubmissionOrchestrator<D>
where
    D: DistributorApi,
{
    distributor: D,
    calculator: ShippingRateCalculator,
    po_numbers: Arc<dyn PoNumberGenerator>,
    issued: Arc<dyn TtlStore<()>>,
    log: Arc<dyn TtlStore<Submission>>,
    clock: SharedClock,
    config: SubmissionConfig,
}

impl<D> OrderSubmissionOrchestrator<D>
where
    D: DistributorApi,
{
    /// Creates an orchestrator with in-memory poNumber registry and
    /// submission log.
    pub fn new(
        distributor: D,
        calculator: ShippingRateCalculator,
        po_numbers: Arc<dyn PoNumberGenerator>,
        config: SubmissionConfig,
    ) -> Self {
        if config.test_mode {
            tracing::warn!("Order test mode is on: orders will not reach the distributor");
        }
        Self {
            distributor,
            calculator,
            po_numbers,
            issued: Arc::new(InMemoryTtlStore::new()),
            log: Arc::new(InMemoryTtlStore::new()),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_po_registry(mut self, issued: Arc<dyn TtlStore<()>>) -> Self {
        self.issued = issued;
        self
    }

    pub fn with_submission_log(mut self, log: Arc<dyn TtlStore<Submission>>) -> Self {
        self.log = log;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    pub fn calculator(&self) -> &ShippingRateCalculator {
        &self.calculator
    }

    /// Generates a poNumber and records it as issued.
    ///
    /// A number that was already issued is a fatal collision: it is never
    /// regenerated or retried.
    pub async fn issue_po_number(&self) -> Result<PoNumber> {
        let po_number = self.po_numbers.generate();
        let fresh = self
            .issued
            .set_if_absent(po_number.as_str(), (), self.config.po_registry_ttl)
            .await;
        if !fresh {
            tracing::error!(target: "ops", %po_number, "Generated poNumber collides with an issued one");
            return Err(SubmissionError::PoNumberCollision(po_number));
        }
        Ok(po_number)
    }

    /// Validates a checkout against the rule set and the current rates.
    pub fn validate(&self, request: &CheckoutRequest) -> std::result::Result<(), ValidationErrors> {
        validation::validate_order(
            &request.customer,
            &request.shipping_address,
            &request.items,
            request.shipping_rate.as_ref(),
            &self.calculator,
        )
    }

    /// Issues a poNumber, validates the checkout and places the order.
    #[tracing::instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn submit(&self, request: CheckoutRequest) -> Result<SubmissionReceipt> {
        let po_number = match self.issue_po_number().await {
            Ok(po_number) => po_number,
            Err(e) => {
                metrics::counter!("submissions_total").increment(1);
                metrics::counter!("submissions_failed_total").increment(1);
                return Err(e);
            }
        };
        self.place_order(&OrderSubmission::new(po_number, request))
            .await
    }

    /// Places an order whose poNumber came from [`issue_po_number`].
    ///
    /// The order is validated again (without touching the distributor on
    /// failure), then the create-cart, add-items, create-order sequence
    /// runs. In test mode the sequence is skipped.
    ///
    /// [`issue_po_number`]: Self::issue_po_number
    #[tracing::instrument(skip(self, order), fields(po_number = %order.po_number))]
    pub async fn place_order(&self, order: &OrderSubmission) -> Result<SubmissionReceipt> {
        metrics::counter!("submissions_total").increment(1);
        let started = Instant::now();

        let mut submission = Submission::default();
        submission.apply(SubmissionEvent::started(
            order.po_number.clone(),
            order.items.len(),
            self.config.test_mode,
            self.clock.now(),
        ));

        let result = match validation::validate_order(
            &order.customer,
            &order.shipping_address,
            &order.items,
            order.shipping_rate.as_ref(),
            &self.calculator,
        ) {
            Ok(()) => {
                submission.apply(SubmissionEvent::Validated);
                self.run(&mut submission, order).await
            }
            Err(errors) => {
                submission.apply(SubmissionEvent::step_failed(
                    SubmissionStep::Validate,
                    errors.to_string(),
                ));
                submission.apply(SubmissionEvent::failed(
                    "validation failed",
                    self.clock.now(),
                ));
                Err(SubmissionError::Validation(errors))
            }
        };

        self.log
            .set(
                order.po_number.as_str(),
                submission.clone(),
                self.config.submission_log_ttl,
            )
            .await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("submission_duration_seconds").record(duration);
        match &result {
            Ok(receipt) => tracing::info!(
                order_number = %receipt.external_order_number,
                duration,
                "Order submitted"
            ),
            Err(e) => {
                metrics::counter!("submissions_failed_total").increment(1);
                tracing::warn!(error = %e, state = %submission.state(), "Order submission failed");
            }
        }
        result
    }

    /// Returns the recorded submission for a poNumber.
    pub async fn get_submission(&self, po_number: &PoNumber) -> Option<Submission> {
        self.log.get(po_number.as_str()).await
    }

    async fn run(
        &self,
        submission: &mut Submission,
        order: &OrderSubmission,
    ) -> Result<SubmissionReceipt> {
        let po_number = &order.po_number;

        if self.config.test_mode {
            let total = order.subtotal()
                + order
                    .shipping_rate
                    .as_ref()
                    .map(|rate| rate.rate)
                    .unwrap_or_default();
            let order_number = format!("TEST-{po_number}");
            submission.apply(SubmissionEvent::order_created(
                &order_number,
                "test",
                total,
                self.clock.now(),
            ));
            return Ok(SubmissionReceipt {
                po_number: po_number.clone(),
                external_order_number: order_number,
                external_order_status: "test".to_string(),
                total,
                test_mode: true,
            });
        }

        // Step 1: create the external cart
        tracing::info!(step = %SubmissionStep::CreateCart, "submission step started");
        let cart = DistributorCart {
            po_number: po_number.clone(),
            warehouse: self.config.warehouse.clone(),
            payment_type: self.config.payment_type.clone(),
            ship_to: order.shipping_address.clone(),
            customer_email: order.contact_email().map(str::to_string),
            shipping_service: order.shipping_rate.as_ref().map(|rate| rate.id.clone()),
        };
        match self.distributor.create_cart(&cart).await {
            Ok(created) => submission.apply(SubmissionEvent::cart_created(created.id)),
            Err(e) => return Err(self.abort(submission, po_number, SubmissionStep::CreateCart, e).await),
        }

        // Step 2: add lines one at a time
        tracing::info!(step = %SubmissionStep::AddItem, lines = order.items.len(), "submission step started");
        for line in &order.items {
            debug_assert!(submission.state().can_add_items());
            let item = DistributorLineItem {
                sku: line.sku.clone(),
                quantity: line.quantity,
                notes: None,
            };
            if let Err(e) = self.distributor.add_item(po_number, &item).await {
                return Err(self.abort(submission, po_number, SubmissionStep::AddItem, e).await);
            }
            submission.apply(SubmissionEvent::item_added(&line.sku, line.quantity));
        }

        // Step 3: turn the cart into an order
        debug_assert!(submission.state().can_create_order());
        tracing::info!(step = %SubmissionStep::CreateOrder, "submission step started");
        match self.distributor.create_order(po_number).await {
            Ok(created) => {
                submission.apply(SubmissionEvent::order_created(
                    &created.order_number,
                    &created.status,
                    created.total,
                    self.clock.now(),
                ));
                Ok(SubmissionReceipt {
                    po_number: po_number.clone(),
                    external_order_number: created.order_number,
                    external_order_status: created.status,
                    total: created.total,
                    test_mode: false,
                })
            }
            Err(e) => Err(self.abort(submission, po_number, SubmissionStep::CreateOrder, e).await),
        }
    }

    /// Records the failed step, compensates if an external cart may exist,
    /// and ends the submission in `Failed`.
    async fn abort(
        &self,
        submission: &mut Submission,
        po_number: &PoNumber,
        step: SubmissionStep,
        error: GatewayError,
    ) -> SubmissionError {
        tracing::warn!(%step, error = %error, "submission step failed");
        submission.apply(SubmissionEvent::step_failed(step, error.to_string()));

        let cleanup = if submission.state().needs_compensation() {
            let outcome = self.compensate(po_number).await;
            submission.apply(match &outcome {
                Ok(()) => SubmissionEvent::CompensationSucceeded,
                Err(failed) => SubmissionEvent::compensation_failed(failed.source.to_string()),
            });
            Some(outcome)
        } else {
            None
        };

        submission.apply(SubmissionEvent::failed(
            format!("{step} failed"),
            self.clock.now(),
        ));

        SubmissionError::StepFailed {
            po_number: po_number.clone(),
            step,
            source: error,
            cleanup,
        }
    }

    /// Deletes the external cart. A failed delete is returned, not raised,
    /// and reported on the `ops` target.
    async fn compensate(&self, po_number: &PoNumber) -> std::result::Result<(), CleanupFailed> {
        metrics::counter!("compensations_total").increment(1);
        match self.distributor.delete_cart(po_number).await {
            Ok(()) => {
                tracing::info!(%po_number, "External cart deleted");
                Ok(())
            }
            Err(source) => {
                metrics::counter!("compensation_failures_total").increment(1);
                tracing::error!(
                    target: "ops",
                    %po_number,
                    error = %source,
                    "Compensating cart delete failed; external cart may be orphaned"
                );
                Err(CleanupFailed {
                    po_number: po_number.clone(),
                    source,
                })
            }
        }
    }
}

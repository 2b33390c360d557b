//! Submission record built from events.

use common::{Money, PoNumber};
use serde::{Deserialize, Serialize};

use crate::events::{SubmissionEvent, SubmissionStep};
use crate::state::SubmissionState;

/// Outcome of the compensating cart delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum CompensationStatus {
    Succeeded,
    Failed(String),
}

/// One order submission, rebuilt by applying its events in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    po_number: Option<PoNumber>,
    state: SubmissionState,
    test_mode: bool,
    line_count: usize,
    lines_added: usize,
    cart_id: Option<String>,
    external_order_number: Option<String>,
    external_status: Option<String>,
    total: Option<Money>,
    failed_step: Option<SubmissionStep>,
    failure_reason: Option<String>,
    compensation: Option<CompensationStatus>,
    history: Vec<SubmissionEvent>,
}

impl Submission {
    pub fn apply(&mut self, event: SubmissionEvent) {
        match &event {
            SubmissionEvent::Started(data) => {
                self.po_number = Some(data.po_number.clone());
                self.line_count = data.line_count;
                self.test_mode = data.test_mode;
                self.state = SubmissionState::Validating;
            }
            SubmissionEvent::Validated => {}
            SubmissionEvent::CartCreated(data) => {
                self.cart_id = Some(data.cart_id.clone());
                self.state = if self.line_count == 0 {
                    SubmissionState::ItemsAdded
                } else {
                    SubmissionState::CartCreated
                };
            }
            SubmissionEvent::ItemAdded(_) => {
                self.lines_added += 1;
                if self.lines_added >= self.line_count {
                    self.state = SubmissionState::ItemsAdded;
                }
            }
            SubmissionEvent::OrderCreated(data) => {
                self.external_order_number = Some(data.order_number.clone());
                self.external_status = Some(data.status.clone());
                self.total = Some(data.total);
                self.state = SubmissionState::OrderCreated;
            }
            SubmissionEvent::StepFailed(data) => {
                self.failed_step = Some(data.step);
                self.failure_reason = Some(data.error.clone());
            }
            SubmissionEvent::CompensationSucceeded => {
                self.compensation = Some(CompensationStatus::Succeeded);
            }
            SubmissionEvent::CompensationFailed(data) => {
                self.compensation = Some(CompensationStatus::Failed(data.error.clone()));
            }
            SubmissionEvent::Failed(data) => {
                self.state = SubmissionState::Failed;
                if self.failure_reason.is_none() {
                    self.failure_reason = Some(data.reason.clone());
                }
            }
        }
        self.history.push(event);
    }
}

// Query methods
impl Submission {
    pub fn po_number(&self) -> Option<&PoNumber> {
        self.po_number.as_ref()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn lines_added(&self) -> usize {
        self.lines_added
    }

    pub fn cart_id(&self) -> Option<&str> {
        self.cart_id.as_deref()
    }

    pub fn external_order_number(&self) -> Option<&str> {
        self.external_order_number.as_deref()
    }

    pub fn external_status(&self) -> Option<&str> {
        self.external_status.as_deref()
    }

    pub fn total(&self) -> Option<Money> {
        self.total
    }

    pub fn failed_step(&self) -> Option<SubmissionStep> {
        self.failed_step
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn compensation(&self) -> Option<&CompensationStatus> {
        self.compensation.as_ref()
    }

    /// Every applied event, oldest first.
    pub fn history(&self) -> &[SubmissionEvent] {
        &self.history
    }
}

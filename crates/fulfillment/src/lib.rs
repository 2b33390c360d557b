//! Order submission to the distributor.
//!
//! [`OrderSubmissionOrchestrator`] validates a checkout and drives the
//! distributor through a fixed sequence keyed by one poNumber:
//! 1. Create the external cart
//! 2. Add each line, one at a time
//! 3. Convert the cart into an order
//!
//! If step 2 or 3 fails, the external cart is deleted as a compensating
//! action. A failed delete is reported as [`CleanupFailed`] on the error and
//! logged for operators; it never replaces the original failure.
//!
//! Each run is tracked as a [`Submission`] built from [`SubmissionEvent`]s
//! and kept in a submission log keyed by poNumber.

pub mod error;
pub mod events;
pub mod order;
pub mod order_lookup;
pub mod orchestrator;
pub mod po_number;
pub mod state;
pub mod submission;
pub mod validation;

pub use error::{CleanupFailed, SubmissionError};
pub use events::{SubmissionEvent, SubmissionStep};
pub use order::{CheckoutRequest, Customer, OrderLine, OrderSubmission, SubmissionReceipt};
pub use order_lookup::OrderLookup;
pub use orchestrator::{OrderSubmissionOrchestrator, SubmissionConfig};
pub use po_number::{PoNumberGenerator, TimestampPoNumberGenerator};
pub use state::SubmissionState;
pub use submission::{CompensationStatus, Submission};
pub use validation::{FieldError, ValidationErrors};

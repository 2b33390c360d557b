//! Checkout requests and the order submissions built from them.

use common::{IdentityId, Money, PoNumber, ShippingAddress};
use serde::{Deserialize, Serialize};
use shipping::ShippingRate;

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Price the store pays the distributor, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealer_price: Option<Money>,
    /// Weight of one unit in pounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    pub fn line_weight(&self) -> f64 {
        self.weight.unwrap_or(0.0) * f64::from(self.quantity)
    }
}

/// Who is ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// `None` for guest checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<IdentityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Everything a checkout submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderLine>,
    /// The rate the customer picked; checked against a fresh calculation.
    #[serde(default)]
    pub shipping_rate: Option<ShippingRate>,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// A checkout bound to its poNumber. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub po_number: PoNumber,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderLine>,
    pub shipping_rate: Option<ShippingRate>,
    pub payment_reference: Option<String>,
}

impl OrderSubmission {
    pub fn new(po_number: PoNumber, request: CheckoutRequest) -> Self {
        Self {
            po_number,
            customer: request.customer,
            shipping_address: request.shipping_address,
            items: request.items,
            shipping_rate: request.shipping_rate,
            payment_reference: request.payment_reference,
        }
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(OrderLine::line_total).sum()
    }

    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(OrderLine::line_weight).sum()
    }

    /// Contact email: the customer's, else the one on the address.
    pub fn contact_email(&self) -> Option<&str> {
        self.customer
            .email
            .as_deref()
            .or(self.shipping_address.email.as_deref())
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub po_number: PoNumber,
    pub external_order_number: String,
    pub external_order_status: String,
    pub total: Money,
    /// The distributor was not called.
    #[serde(default)]
    pub test_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sku: &str, cents: i64, quantity: u32) -> OrderLine {
        OrderLine {
            sku: sku.into(),
            name: sku.into(),
            quantity,
            unit_price: Money::from_cents(cents),
            dealer_price: None,
            weight: Some(1.25),
        }
    }

    #[test]
    fn test_subtotal_and_weight() {
        let order = OrderSubmission {
            po_number: PoNumber::new("WEB-1"),
            customer: Customer::default(),
            shipping_address: ShippingAddress::default(),
            items: vec![line("A", 1000, 1), line("B", 500, 2)],
            shipping_rate: None,
            payment_reference: None,
        };
        assert_eq!(order.subtotal(), Money::from_cents(2000));
        assert!((order.total_weight() - 3.75).abs() < 1e-9);
    }

    #[test]
    fn test_contact_email_prefers_customer() {
        let mut order = OrderSubmission {
            po_number: PoNumber::new("WEB-1"),
            customer: Customer::default(),
            shipping_address: ShippingAddress {
                email: Some("ship@example.com".into()),
                ..Default::default()
            },
            items: Vec::new(),
            shipping_rate: None,
            payment_reference: None,
        };
        assert_eq!(order.contact_email(), Some("ship@example.com"));
        order.customer.email = Some("me@example.com".into());
        assert_eq!(order.contact_email(), Some("me@example.com"));
    }
}

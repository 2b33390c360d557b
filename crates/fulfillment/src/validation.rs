//! Checkout validation rules.
//!
//! Every rule is checked and all violations are reported together, so the
//! caller can show one message per field.

use common::ShippingAddress;
use serde::{Deserialize, Serialize};
use shipping::{ShippingRate, ShippingRateCalculator};

use crate::order::{Customer, OrderLine};

/// A rule violation on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A non-empty list of field errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }

    /// Returns true if any error is reported on `field`.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{} {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validates a whole order.
///
/// When `rate` is given it must equal (same id, same price) one of the rates
/// the calculator produces for this address, subtotal and weight.
pub fn validate_order(
    customer: &Customer,
    address: &ShippingAddress,
    items: &[OrderLine],
    rate: Option<&ShippingRate>,
    calculator: &ShippingRateCalculator,
) -> Result<(), ValidationErrors> {
    let mut errors = validate_address(address);

    if let Some(email) = &customer.email {
        if !is_valid_email(email) {
            errors.push(FieldError::new("customer.email", "is not a valid email address"));
        }
    }

    errors.extend(validate_lines(items));

    if let Some(rate) = rate {
        if errors.is_empty() {
            let subtotal = items.iter().map(OrderLine::line_total).sum();
            let weight = items.iter().map(OrderLine::line_weight).sum();
            match calculator.calculate(address, subtotal, weight) {
                Ok(rates) if rates.iter().any(|r| r.matches(rate)) => {}
                Ok(_) => errors.push(FieldError::new(
                    "shipping_rate",
                    "no longer matches the available rates",
                )),
                Err(e) => errors.push(FieldError::new("shipping_rate", e.to_string())),
            }
        }
    }

    into_result(errors)
}

/// Validates a shipping address on its own.
pub fn check_address(address: &ShippingAddress) -> Result<(), ValidationErrors> {
    into_result(validate_address(address))
}

fn into_result(errors: Vec<FieldError>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

/// Checks a shipping address. Field names are prefixed `shipping_address.`.
pub fn validate_address(address: &ShippingAddress) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let required = [
        ("name", &address.name),
        ("street1", &address.street1),
        ("city", &address.city),
        ("state", &address.state),
        ("zip", &address.zip),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(FieldError::new(
                format!("shipping_address.{field}"),
                "is required",
            ));
        }
    }

    let state = address.state.trim();
    if !state.is_empty() && !(state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()))
    {
        errors.push(FieldError::new(
            "shipping_address.state",
            "must be a two-letter state code",
        ));
    }

    let zip = address.zip.trim();
    if !zip.is_empty() && !is_valid_zip(zip) {
        errors.push(FieldError::new(
            "shipping_address.zip",
            "must be NNNNN or NNNNN-NNNN",
        ));
    }

    if let Some(email) = &address.email {
        if !is_valid_email(email) {
            errors.push(FieldError::new(
                "shipping_address.email",
                "is not a valid email address",
            ));
        }
    }

    if let Some(phone) = &address.phone {
        if !is_valid_phone(phone) {
            errors.push(FieldError::new(
                "shipping_address.phone",
                "must contain 10 to 15 digits",
            ));
        }
    }

    errors
}

fn validate_lines(items: &[OrderLine]) -> Vec<FieldError> {
    if items.is_empty() {
        return vec![FieldError::new("items", "at least one item is required")];
    }

    let mut errors = Vec::new();
    for (i, line) in items.iter().enumerate() {
        if line.sku.trim().is_empty() {
            errors.push(FieldError::new(format!("items[{i}].sku"), "is required"));
        }
        if line.quantity == 0 {
            errors.push(FieldError::new(
                format!("items[{i}].quantity"),
                "must be at least 1",
            ));
        }
        if line.unit_price.is_negative() {
            errors.push(FieldError::new(
                format!("items[{i}].unit_price"),
                "must not be negative",
            ));
        }
        if line.dealer_price.is_some_and(|p| p.is_negative()) {
            errors.push(FieldError::new(
                format!("items[{i}].dealer_price"),
                "must not be negative",
            ));
        }
        if line.weight.is_some_and(|w| !w.is_finite() || w < 0.0) {
            errors.push(FieldError::new(
                format!("items[{i}].weight"),
                "must be a non-negative number",
            ));
        }
    }
    errors
}

fn is_valid_zip(zip: &str) -> bool {
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    match zip.split_once('-') {
        None => digits(zip, 5),
        Some((head, tail)) => digits(head, 5) && digits(tail, 4),
    }
}

fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn is_valid_phone(phone: &str) -> bool {
    let allowed = |c: char| c.is_ascii_digit() || " -().+".contains(c);
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    phone.chars().all(allowed) && (10..=15).contains(&digits)
}

use serde::{Deserialize, Serialize};

/// Ship-to address for a cart or order submission.
///
/// Once attached to a pending order submission it is treated as immutable:
/// submissions take their own copy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub street1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ShippingAddress {
    /// Normalized two-letter state code (trimmed, upper-cased).
    pub fn state_code(&self) -> String {
        self.state.trim().to_ascii_uppercase()
    }

    /// Country code, defaulting to `US`.
    pub fn country_or_default(&self) -> &str {
        self.country.as_deref().unwrap_or("US")
    }
}

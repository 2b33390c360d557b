//! Order description carried in payment-intent metadata.
//!
//! Payment processors only store flat string maps, so the order is flattened
//! into string keys when the payment is initiated and parsed back into a
//! typed value when the capture webhook arrives.

use std::collections::BTreeMap;

use common::{IdentityId, Money, ShippingAddress};
use fulfillment::OrderLine;
use serde::{Deserialize, Serialize};
use shipping::ShippingRate;

pub const KEY_ITEMS: &str = "items";
pub const KEY_IDENTITY: &str = "identity_id";

const KEY_NAME: &str = "shipping_name";
const KEY_STREET1: &str = "shipping_street1";
const KEY_STREET2: &str = "shipping_street2";
const KEY_CITY: &str = "shipping_city";
const KEY_STATE: &str = "shipping_state";
const KEY_ZIP: &str = "shipping_zip";
const KEY_COUNTRY: &str = "shipping_country";
const KEY_PHONE: &str = "shipping_phone";
const KEY_EMAIL: &str = "shipping_email";
const KEY_RATE_ID: &str = "shipping_rate_id";
const KEY_RATE_CENTS: &str = "shipping_rate_cents";

/// Line item as stored in metadata. Prices are integer cents.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataItem {
    sku: String,
    #[serde(default)]
    name: String,
    quantity: u32,
    unit_price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dealer_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
}

impl From<&OrderLine> for MetadataItem {
    fn from(line: &OrderLine) -> Self {
        Self {
            sku: line.sku.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.cents(),
            dealer_price: line.dealer_price.map(|p| p.cents()),
            weight: line.weight,
        }
    }
}

impl From<MetadataItem> for OrderLine {
    fn from(item: MetadataItem) -> Self {
        Self {
            sku: item.sku,
            name: item.name,
            quantity: item.quantity,
            unit_price: Money::from_cents(item.unit_price),
            dealer_price: item.dealer_price.map(Money::from_cents),
            weight: item.weight,
        }
    }
}

/// An order rebuilt from payment metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderMetadata {
    pub items: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    /// `None` for guest checkout.
    pub identity_id: Option<IdentityId>,
    /// The shipping option the payer was charged for.
    pub shipping_rate: Option<SelectedRate>,
}

/// A shipping rate as charged: the option id and the price paid for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRate {
    pub id: String,
    pub price: Money,
}

impl SelectedRate {
    /// Returns true if `rate` is this option at the price that was charged.
    pub fn is(&self, rate: &ShippingRate) -> bool {
        rate.id == self.id && rate.rate == self.price
    }
}

impl From<&ShippingRate> for SelectedRate {
    fn from(rate: &ShippingRate) -> Self {
        Self {
            id: rate.id.clone(),
            price: rate.rate,
        }
    }
}

/// Outcome of parsing payment metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOrderMetadata {
    Valid(OrderMetadata),
    Invalid(String),
}

/// Flattens an order into payment-intent metadata.
pub fn encode_order_metadata(
    items: &[OrderLine],
    address: &ShippingAddress,
    identity_id: Option<&IdentityId>,
    shipping_rate: Option<&ShippingRate>,
) -> BTreeMap<String, String> {
    let wire: Vec<MetadataItem> = items.iter().map(MetadataItem::from).collect();
    let mut metadata = BTreeMap::new();
    metadata.insert(
        KEY_ITEMS.to_string(),
        serde_json::to_string(&wire).unwrap_or_else(|_| "[]".to_string()),
    );

    let mut put = |key: &str, value: Option<&str>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            metadata.insert(key.to_string(), value.to_string());
        }
    };
    put(KEY_NAME, Some(address.name.as_str()));
    put(KEY_STREET1, Some(address.street1.as_str()));
    put(KEY_STREET2, address.street2.as_deref());
    put(KEY_CITY, Some(address.city.as_str()));
    put(KEY_STATE, Some(address.state.as_str()));
    put(KEY_ZIP, Some(address.zip.as_str()));
    put(KEY_COUNTRY, address.country.as_deref());
    put(KEY_PHONE, address.phone.as_deref());
    put(KEY_EMAIL, address.email.as_deref());
    put(KEY_IDENTITY, identity_id.map(IdentityId::as_str));

    if let Some(rate) = shipping_rate {
        metadata.insert(KEY_RATE_ID.to_string(), rate.id.clone());
        metadata.insert(KEY_RATE_CENTS.to_string(), rate.rate.cents().to_string());
    }

    metadata
}

/// Rebuilds an order from payment-intent metadata.
///
/// Missing or empty items, or missing required shipping fields, make the
/// metadata `Invalid`. Format rules (state code, zip) are left to order
/// validation.
pub fn parse_order_metadata(metadata: &BTreeMap<String, String>) -> ParsedOrderMetadata {
    let raw = match metadata.get(KEY_ITEMS) {
        Some(raw) => raw,
        None => return ParsedOrderMetadata::Invalid("items missing".to_string()),
    };
    let items: Vec<MetadataItem> = match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => return ParsedOrderMetadata::Invalid(format!("items unparseable: {e}")),
    };
    if items.is_empty() {
        return ParsedOrderMetadata::Invalid("items empty".to_string());
    }

    let field = |key: &str| {
        metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut missing = Vec::new();
    let mut required = |key: &'static str| {
        field(key).unwrap_or_else(|| {
            missing.push(key);
            String::new()
        })
    };
    let shipping_address = ShippingAddress {
        name: required(KEY_NAME),
        street1: required(KEY_STREET1),
        city: required(KEY_CITY),
        state: required(KEY_STATE),
        zip: required(KEY_ZIP),
        street2: field(KEY_STREET2),
        country: field(KEY_COUNTRY),
        phone: field(KEY_PHONE),
        email: field(KEY_EMAIL),
    };
    if !missing.is_empty() {
        return ParsedOrderMetadata::Invalid(format!("missing {}", missing.join(", ")));
    }

    let shipping_rate = match (field(KEY_RATE_ID), field(KEY_RATE_CENTS)) {
        (None, None) => None,
        (Some(id), Some(cents)) => match cents.parse::<i64>() {
            Ok(cents) if cents >= 0 => Some(SelectedRate {
                id,
                price: Money::from_cents(cents),
            }),
            _ => {
                return ParsedOrderMetadata::Invalid(format!(
                    "shipping rate price unparseable: {cents}"
                ));
            }
        },
        (Some(_), None) => {
            return ParsedOrderMetadata::Invalid(format!("missing {KEY_RATE_CENTS}"));
        }
        (None, Some(_)) => {
            return ParsedOrderMetadata::Invalid(format!("missing {KEY_RATE_ID}"));
        }
    };

    ParsedOrderMetadata::Valid(OrderMetadata {
        items: items.into_iter().map(OrderLine::from).collect(),
        shipping_address,
        identity_id: field(KEY_IDENTITY).map(IdentityId::new),
        shipping_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ada Lovelace".into(),
            street1: "1 Main St".into(),
            street2: Some("Apt 2".into()),
            city: "Sacramento".into(),
            state: "CA".into(),
            zip: "95814".into(),
            email: Some("ada@example.com".into()),
            ..Default::default()
        }
    }

    fn line() -> OrderLine {
        OrderLine {
            sku: "A".into(),
            name: "Widget".into(),
            quantity: 2,
            unit_price: Money::from_cents(1250),
            dealer_price: Some(Money::from_cents(700)),
            weight: Some(1.5),
        }
    }

    #[test]
    fn test_encoded_metadata_parses_back() {
        let identity = IdentityId::new("user_1");
        let metadata = encode_order_metadata(&[line()], &address(), Some(&identity), None);

        assert_eq!(metadata["shipping_state"], "CA");
        assert!(!metadata.contains_key("shipping_phone"));
        assert!(metadata["items"].contains("\"unitPrice\":1250"));

        match parse_order_metadata(&metadata) {
            ParsedOrderMetadata::Valid(order) => {
                assert_eq!(order.items, vec![line()]);
                assert_eq!(order.shipping_address, address());
                assert_eq!(order.identity_id, Some(identity));
                assert_eq!(order.shipping_rate, None);
            }
            ParsedOrderMetadata::Invalid(reason) => panic!("unexpected invalid: {reason}"),
        }
    }

    #[test]
    fn test_guest_has_no_identity() {
        let metadata = encode_order_metadata(&[line()], &address(), None, None);
        assert!(matches!(
            parse_order_metadata(&metadata),
            ParsedOrderMetadata::Valid(OrderMetadata {
                identity_id: None,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_or_empty_items_are_invalid() {
        let mut metadata = encode_order_metadata(&[line()], &address(), None, None);

        metadata.remove(KEY_ITEMS);
        assert_eq!(
            parse_order_metadata(&metadata),
            ParsedOrderMetadata::Invalid("items missing".into())
        );

        metadata.insert(KEY_ITEMS.into(), "[]".into());
        assert_eq!(
            parse_order_metadata(&metadata),
            ParsedOrderMetadata::Invalid("items empty".into())
        );

        metadata.insert(KEY_ITEMS.into(), "[{\"sku\":".into());
        assert!(matches!(
            parse_order_metadata(&metadata),
            ParsedOrderMetadata::Invalid(reason) if reason.starts_with("items unparseable")
        ));
    }

    #[test]
    fn test_missing_shipping_fields_are_listed() {
        let mut metadata = encode_order_metadata(&[line()], &address(), None, None);
        metadata.remove("shipping_city");
        metadata.insert("shipping_zip".into(), "  ".into());
        assert_eq!(
            parse_order_metadata(&metadata),
            ParsedOrderMetadata::Invalid("missing shipping_city, shipping_zip".into())
        );
    }

    #[test]
    fn test_selected_rate_is_carried() {
        let rate = ShippingRate {
            id: "west-expedited".into(),
            service: "Expedited".into(),
            carrier: "UPS".into(),
            rate: Money::from_cents(1899),
            delivery_days: 2,
            guaranteed: true,
        };
        let metadata = encode_order_metadata(&[line()], &address(), None, Some(&rate));
        assert_eq!(metadata["shipping_rate_id"], "west-expedited");
        assert_eq!(metadata["shipping_rate_cents"], "1899");

        let ParsedOrderMetadata::Valid(order) = parse_order_metadata(&metadata) else {
            panic!("expected valid metadata");
        };
        let selected = order.shipping_rate.unwrap();
        assert!(selected.is(&rate));
    }

    #[test]
    fn test_half_written_rate_is_invalid() {
        let mut metadata = encode_order_metadata(&[line()], &address(), None, None);
        metadata.insert("shipping_rate_id".into(), "west-ground".into());
        assert_eq!(
            parse_order_metadata(&metadata),
            ParsedOrderMetadata::Invalid("missing shipping_rate_cents".into())
        );

        metadata.insert("shipping_rate_cents".into(), "cheap".into());
        assert!(matches!(
            parse_order_metadata(&metadata),
            ParsedOrderMetadata::Invalid(reason) if reason.contains("unparseable")
        ));
    }
}

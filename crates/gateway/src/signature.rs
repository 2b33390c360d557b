//! Webhook signature scheme.
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The HMAC-SHA256 is computed with the shared secret over
//! `"<t>.<raw body>"`. Several `v1` entries may be present while a secret
//! is being rotated; any match is accepted.

use std::sync::Arc;

use chrono::Duration;
use common::{SharedClock, SystemClock};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Default accepted age of a signed timestamp.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Signs and verifies webhook payloads with a shared secret.
#[derive(Clone)]
pub struct WebhookSigner {
    secret: SecretString,
    tolerance: Duration,
    clock: SharedClock,
}

impl std::fmt::Debug for WebhookSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSigner")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl WebhookSigner {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance: Duration::seconds(DEFAULT_TOLERANCE_SECS),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Produces a signature header for `payload` at the current time.
    pub fn sign(&self, payload: &[u8]) -> String {
        self.sign_at(payload, self.clock.now().timestamp())
    }

    /// Produces a signature header for `payload` at `timestamp`.
    pub fn sign_at(&self, payload: &[u8], timestamp: i64) -> String {
        let mac = self.mac(timestamp, payload);
        format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        )
    }

    /// Checks `header` against `payload`.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| SignatureError::MalformedHeader)?,
                    );
                }
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
        if candidates.is_empty() {
            return Err(SignatureError::MalformedHeader);
        }

        // `t` is untrusted; an age that does not fit in i64 is stale.
        let age_secs = self
            .clock
            .now()
            .timestamp()
            .checked_sub(timestamp)
            .ok_or(SignatureError::StaleTimestamp { age_secs: i64::MAX })?;
        if age_secs.unsigned_abs() > self.tolerance.num_seconds().unsigned_abs() {
            return Err(SignatureError::StaleTimestamp { age_secs });
        }

        let matched = candidates.into_iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| self.mac(timestamp, payload).verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });
        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> HmacSha256 {
        // HMAC accepts keys of any length, so construction cannot fail.
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::ManualClock;

    fn signer() -> (WebhookSigner, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        let signer = WebhookSigner::new(SecretString::from("whsec_test".to_string()))
            .with_clock(Arc::new(clock.clone()));
        (signer, clock)
    }

    #[test]
    fn test_sign_then_verify() {
        let (signer, _) = signer();
        let body = br#"{"id":"evt_1"}"#;
        let header = signer.sign(body);
        assert!(header.starts_with("t="));
        assert!(signer.verify(body, Some(&header)).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let (signer, _) = signer();
        let header = signer.sign(br#"{"amount":100}"#);
        assert_eq!(
            signer.verify(br#"{"amount":1}"#, Some(&header)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (signer, clock) = signer();
        let other = WebhookSigner::new(SecretString::from("whsec_other".to_string()))
            .with_clock(Arc::new(clock));
        let body = b"{}";
        assert_eq!(
            signer.verify(body, Some(&other.sign(body))),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let (signer, clock) = signer();
        let body = b"{}";
        let header = signer.sign(body);
        clock.advance(Duration::seconds(DEFAULT_TOLERANCE_SECS + 1));
        assert!(matches!(
            signer.verify(body, Some(&header)),
            Err(SignatureError::StaleTimestamp { .. })
        ));
    }

    #[test]
    fn test_extreme_timestamps_are_stale() {
        let (signer, _) = signer();
        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            assert!(
                matches!(
                    signer.verify(b"{}", Some(header)),
                    Err(SignatureError::StaleTimestamp { .. })
                ),
                "{header}"
            );
        }
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        let (signer, _) = signer();
        assert_eq!(signer.verify(b"{}", None), Err(SignatureError::MissingHeader));
        assert_eq!(
            signer.verify(b"{}", Some("garbage")),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            signer.verify(b"{}", Some("t=abc,v1=00")),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            signer.verify(b"{}", Some("t=1748736000")),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn test_any_rotated_signature_accepted() {
        let (signer, _) = signer();
        let body = b"{}";
        let header = signer.sign(body);
        let rotated = format!("{header},v1=deadbeef");
        assert!(signer.verify(body, Some(&rotated)).is_ok());
    }
}

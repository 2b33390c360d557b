//! poNumber generation.

use std::sync::Arc;

use common::{PoNumber, SharedClock, SystemClock};
use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 6;

/// Produces new poNumbers.
pub trait PoNumberGenerator: Send + Sync {
    fn generate(&self) -> PoNumber;
}

impl<T: PoNumberGenerator + ?Sized> PoNumberGenerator for Arc<T> {
    fn generate(&self) -> PoNumber {
        (**self).generate()
    }
}

/// `<PREFIX>-<yyyymmddHHMMSS>-<6 random base-36 chars>`.
///
/// Two numbers generated within the same second collide with probability
/// 1 / 36^6 per pair.
#[derive(Clone)]
pub struct TimestampPoNumberGenerator {
    prefix: String,
    clock: SharedClock,
}

impl std::fmt::Debug for TimestampPoNumberGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampPoNumberGenerator")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl TimestampPoNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

impl PoNumberGenerator for TimestampPoNumberGenerator {
    fn generate(&self) -> PoNumber {
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| char::from(SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())]))
            .collect();
        PoNumber::new(format!(
            "{}-{}-{}",
            self.prefix,
            self.clock.now().format("%Y%m%d%H%M%S"),
            suffix
        ))
    }
}

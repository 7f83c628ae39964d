//! Bucketer implementation.
//!
//! A visitor's bucket decides which experiment variant they are offered. The
//! hash input is `{visitor_id}-{feature_flag}-{epoch}`, so buckets are stable
//! for a given visitor and flag until the experiment epoch is bumped, at which
//! point the whole population reshuffles.

use sha2::{Digest, Sha256};

/// Number of buckets visitors are split into.
pub const TOTAL_BUCKETS: u64 = 1000;

/// Maps an opaque input to a bucket in `0..total_buckets`.
pub trait Bucketer {
    /// Returns the bucket for `input`.
    fn bucket(&self, input: impl AsRef<[u8]>, total_buckets: u64) -> u64;
}

/// The default (and only) bucketer.
///
/// Hashes the input with SHA-256 and reduces the digest modulo
/// `total_buckets`. The reduction folds the digest a byte at a time, so it is
/// exact over the full 256-bit value rather than a truncated prefix.
pub struct Sha256Bucketer;

impl Bucketer for Sha256Bucketer {
    fn bucket(&self, input: impl AsRef<[u8]>, total_buckets: u64) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(input.as_ref());
        let digest = hasher.finalize();
        // The accumulator stays below `total_buckets`, so the widened
        // intermediate never exceeds 2^72.
        let modulus = u128::from(total_buckets);
        let bucket = digest
            .iter()
            .fold(0u128, |acc, &byte| (acc * 256 + u128::from(byte)) % modulus);
        bucket as u64
    }
}

/// Builds the canonical hash input for a visitor, flag, and epoch.
///
/// # Examples
/// ```
/// # use atomic_experiments::{bucket_input, Bucketer, Sha256Bucketer, TOTAL_BUCKETS};
/// let input = bucket_input("v-1", "checkout-button", 7);
/// assert_eq!(input, "v-1-checkout-button-7");
/// assert_eq!(Sha256Bucketer.bucket(input, TOTAL_BUCKETS), 971);
/// ```
pub fn bucket_input(visitor_id: &str, feature_flag: &str, epoch: u64) -> String {
    format!("{visitor_id}-{feature_flag}-{epoch}")
}

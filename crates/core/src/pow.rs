//! Proof-of-work target arithmetic and mining controls.
//!
//! Difficulty counts hexadecimal digits: a block mined at difficulty `d`
//! has a fingerprint below `2^(bits - 4d)`, i.e. its top `4d` bits are zero.

use crate::block::ValidationReport;
use crate::error::ConfigurationError;
use crate::hash::{Digest, HashFunction};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Zero bits required per unit of difficulty.
pub const BITS_PER_DIFFICULTY: usize = 4;

/// Reasons a nonce search stopped before meeting its target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("cancelled after {attempts} attempts (last nonce {nonce})")]
    Cancelled { attempts: u64, nonce: u64 },

    #[error("budget of {attempts} attempts exhausted (last nonce {nonce})")]
    BudgetExhausted { attempts: u64, nonce: u64 },
}

/// Limits for a nonce search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Maximum nonces to try. `None` searches until the target is met.
    pub max_attempts: Option<u64>,
    /// Emit a progress event every this many attempts (0 disables).
    pub progress_interval: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            progress_interval: 100_000,
        }
    }
}

impl MiningConfig {
    /// A search that gives up after `max_attempts` nonces.
    pub fn bounded(max_attempts: u64) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }
}

/// Shared flag a supervisor raises to stop a running search.
///
/// Polled once per nonce. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The numeric bound a fingerprint must stay under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    zero_bits: usize,
    digest_bits: usize,
}

impl Target {
    /// Target for `difficulty` over digests of `hash_function`.
    pub fn new(difficulty: u32, hash_function: HashFunction) -> Result<Self, ConfigurationError> {
        let zero_bits = difficulty as usize * BITS_PER_DIFFICULTY;
        let digest_bits = hash_function.output_bits();
        if zero_bits > digest_bits {
            return Err(ConfigurationError::DifficultyTooHigh {
                difficulty,
                required: zero_bits,
                available: digest_bits,
            });
        }
        Ok(Self {
            zero_bits,
            digest_bits,
        })
    }

    /// Leading zero bits a fingerprint needs.
    pub fn zero_bits(&self) -> usize {
        self.zero_bits
    }

    /// The target is `2^exponent`.
    pub fn exponent(&self) -> usize {
        self.digest_bits - self.zero_bits
    }

    /// Whether `digest`, read as a big-endian integer, is below the target.
    pub fn is_met_by(&self, digest: &Digest) -> bool {
        count_leading_zero_bits(digest.as_bytes()) as usize >= self.zero_bits
    }
}

/// Count leading zero bits of a big-endian byte string.
pub fn count_leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut total = 0u32;
    for b in bytes {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningOutcome {
    /// The nonce that met the target.
    pub nonce: u64,
    /// Nonces tried after the starting one.
    pub attempts: u64,
    /// The winning fingerprint.
    pub hash: Digest,
    /// What the pre-mining validation dropped.
    pub validation: ValidationReport,
}

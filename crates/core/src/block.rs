//! Blocks: a merkle tree of transactions bound into a minable fingerprint.

use crate::error::{decode_record, IntegrityError, Result};
use crate::hash::{canonical_join, Digest, HashFunction};
use crate::merkle::{LeafItem, MerkleTree, MerkleTreeRecord};
use crate::pow::{CancellationFlag, MiningConfig, MiningError, MiningOutcome, Target};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Unix time of 2000-01-01T00:00:00Z, the origin of ledger timestamps.
pub const LEDGER_EPOCH_UNIX: i64 = 946_684_800;

/// Why `validate` dropped a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The signature does not match the transaction's current fields.
    InvalidSignature,
    /// The transaction was never signed.
    Unsigned,
    /// A textual payload, which carries no signature.
    NotATransaction,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::InvalidSignature => f.write_str("invalid signature"),
            DropReason::Unsigned => f.write_str("unsigned"),
            DropReason::NotATransaction => f.write_str("not a transaction"),
        }
    }
}

/// A leaf removed by `validate`. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    /// Position of the leaf before filtering.
    pub position: usize,
    pub reason: DropReason,
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Leaves that survived.
    pub kept: usize,
    pub dropped: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    /// True when nothing was dropped.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Persisted form of a [`Block`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockRecord {
    pub index: u64,
    pub timestamp: u64,
    pub nonce: u64,
    pub previous_hash: String,
    pub miner: String,
    pub hash_function: String,
    pub transactions: MerkleTreeRecord,
    pub hash: String,
}

/// A block of transactions.
///
/// Fields are private: every mutation goes through a method that keeps
/// `hash` in step with the rest of the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    index: u64,
    timestamp: u64,
    nonce: u64,
    previous_hash: String,
    miner: String,
    hash_function: HashFunction,
    transactions: MerkleTree,
    hash: Digest,
}

impl Block {
    /// Build a block over `transactions` and compute its fingerprint.
    pub fn new<I, T>(
        index: u64,
        transactions: I,
        previous_hash: impl Into<String>,
        miner: impl Into<String>,
        hash_function: HashFunction,
        nonce: u64,
        timestamp: u64,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<LeafItem>,
    {
        let transactions = MerkleTree::new(transactions, hash_function)?;
        let previous_hash = previous_hash.into();
        let miner = miner.into();
        let hash = fingerprint(
            index,
            timestamp,
            nonce,
            &previous_hash,
            &miner,
            transactions.header(),
            hash_function,
        );
        Ok(Self {
            index,
            timestamp,
            nonce,
            previous_hash,
            miner,
            hash_function,
            transactions,
            hash,
        })
    }

    /// Seconds elapsed since the ledger epoch.
    pub fn current_timestamp() -> u64 {
        (Utc::now().timestamp() - LEDGER_EPOCH_UNIX).max(0) as u64
    }

    /// Append transactions, rebuild the tree and refresh the fingerprint.
    pub fn add_transactions<I, T>(&mut self, transactions: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<LeafItem>,
    {
        self.transactions.add(transactions)?;
        self.rehash();
        Ok(())
    }

    /// Drop every leaf whose signature does not verify, then rebuild.
    ///
    /// Drops are logged and returned, never raised. Fails only when nothing
    /// would be left, in which case the block is unchanged.
    pub fn validate(&mut self) -> Result<ValidationReport> {
        let mut kept = Vec::with_capacity(self.transactions.len());
        let mut dropped = Vec::new();

        for (position, leaf) in self.transactions.leaves().iter().enumerate() {
            let reason = match leaf.as_transaction() {
                Some(tx) if tx.verify() => {
                    kept.push(leaf.clone());
                    continue;
                }
                Some(tx) if !tx.is_signed() => DropReason::Unsigned,
                Some(_) => DropReason::InvalidSignature,
                None => DropReason::NotATransaction,
            };
            warn!(block = self.index, position, %reason, "invalid transaction ignored");
            dropped.push(ValidationDiagnostic { position, reason });
        }

        let report = ValidationReport {
            kept: kept.len(),
            dropped,
        };
        self.transactions.replace_leaves(kept)?;
        self.rehash();
        Ok(report)
    }

    /// Validate, then search nonces until the fingerprint meets `difficulty`.
    ///
    /// Unbounded; see [`Block::mine_with`] for a budgeted, cancellable search.
    pub fn mine(&mut self, difficulty: u32) -> Result<MiningOutcome> {
        self.mine_with(difficulty, &MiningConfig::default(), &CancellationFlag::new())
    }

    /// Validate, then search nonces under `config`, polling `cancel` before each nonce.
    ///
    /// When the search stops early the block keeps the last nonce tried and a
    /// matching fingerprint.
    pub fn mine_with(
        &mut self,
        difficulty: u32,
        config: &MiningConfig,
        cancel: &CancellationFlag,
    ) -> Result<MiningOutcome> {
        let target = Target::new(difficulty, self.hash_function)?;
        let validation = self.validate()?;
        let mut attempts = 0u64;

        while !target.is_met_by(&self.hash) {
            if cancel.is_cancelled() {
                warn!(block = self.index, attempts, nonce = self.nonce, "mining cancelled");
                return Err(MiningError::Cancelled {
                    attempts,
                    nonce: self.nonce,
                }
                .into());
            }
            if config.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(block = self.index, attempts, nonce = self.nonce, "mining budget exhausted");
                return Err(MiningError::BudgetExhausted {
                    attempts,
                    nonce: self.nonce,
                }
                .into());
            }

            self.nonce = self.nonce.wrapping_add(1);
            self.rehash();
            attempts += 1;

            if config.progress_interval > 0 && attempts % config.progress_interval == 0 {
                debug!(block = self.index, attempts, nonce = self.nonce, "mining in progress");
            }
        }

        info!(
            "Mined block {} with nonce {} after {} attempts and hash {}",
            self.index, self.nonce, attempts, self.hash
        );

        Ok(MiningOutcome {
            nonce: self.nonce,
            attempts,
            hash: self.hash.clone(),
            validation,
        })
    }

    /// Whether the current fingerprint already satisfies `difficulty`.
    pub fn meets_difficulty(&self, difficulty: u32) -> Result<bool> {
        Ok(Target::new(difficulty, self.hash_function)?.is_met_by(&self.hash))
    }

    /// The fingerprint pre-image.
    pub fn canonical_encoding(&self) -> String {
        canonical_encoding(
            self.index,
            self.timestamp,
            self.nonce,
            &self.previous_hash,
            &self.miner,
            self.transactions.header(),
            self.hash_function,
        )
    }

    fn rehash(&mut self) {
        self.hash = self.hash_function.digest_str(&self.canonical_encoding());
    }

    /// Get the position of the block in the chain.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Get the block timestamp, in seconds since the ledger epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Get the current nonce.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Fingerprint of the preceding block, as given.
    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// Get the miner id.
    pub fn miner(&self) -> &str {
        &self.miner
    }

    /// Get the hash function of the block.
    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Get the merkle tree of transactions.
    pub fn transactions(&self) -> &MerkleTree {
        &self.transactions
    }

    /// The block fingerprint.
    pub fn hash(&self) -> &Digest {
        &self.hash
    }

    /// The merkle header of the embedded tree.
    pub fn header(&self) -> &Digest {
        self.transactions.header()
    }

    /// Current number of leaves in the embedded tree.
    pub fn number_of_elements(&self) -> usize {
        self.transactions.number_of_elements()
    }

    /// Convert to the persisted form.
    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            index: self.index,
            timestamp: self.timestamp,
            nonce: self.nonce,
            previous_hash: self.previous_hash.clone(),
            miner: self.miner.clone(),
            hash_function: self.hash_function.name().to_string(),
            transactions: self.transactions.to_record(),
            hash: self.hash.to_hex(),
        }
    }

    /// Rebuild a block from its record, recomputing the tree and the fingerprint.
    pub fn from_record(record: &BlockRecord) -> Result<Self> {
        const ENTITY: &str = "block";
        let hash_function = record
            .hash_function
            .parse::<HashFunction>()
            .map_err(|e| IntegrityError::malformed(ENTITY, e))?;
        let transactions = MerkleTree::from_record(&record.transactions)?;
        if transactions.hash_function() != hash_function {
            return Err(IntegrityError::malformed(
                ENTITY,
                format!(
                    "tree hashed with {} but block with {}",
                    transactions.hash_function(),
                    hash_function
                ),
            )
            .into());
        }

        let hash = fingerprint(
            record.index,
            record.timestamp,
            record.nonce,
            &record.previous_hash,
            &record.miner,
            transactions.header(),
            hash_function,
        );
        if hash.to_hex() != record.hash {
            return Err(IntegrityError::DigestMismatch {
                entity: ENTITY,
                stored: record.hash.clone(),
                computed: hash.to_hex(),
            }
            .into());
        }

        Ok(Self {
            index: record.index,
            timestamp: record.timestamp,
            nonce: record.nonce,
            previous_hash: record.previous_hash.clone(),
            miner: record.miner.clone(),
            hash_function,
            transactions,
            hash,
        })
    }

    /// Serialize to a JSON record.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// Parse a JSON record and check its digests.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: BlockRecord = decode_record("block", json)?;
        Self::from_record(&record)
    }
}

fn canonical_encoding(
    index: u64,
    timestamp: u64,
    nonce: u64,
    previous_hash: &str,
    miner: &str,
    header: &Digest,
    hash_function: HashFunction,
) -> String {
    canonical_join(&[
        index.to_string().as_str(),
        timestamp.to_string().as_str(),
        nonce.to_string().as_str(),
        previous_hash,
        miner,
        header.to_hex().as_str(),
        hash_function.name(),
    ])
}

fn fingerprint(
    index: u64,
    timestamp: u64,
    nonce: u64,
    previous_hash: &str,
    miner: &str,
    header: &Digest,
    hash_function: HashFunction,
) -> Digest {
    hash_function.digest_str(&canonical_encoding(
        index,
        timestamp,
        nonce,
        previous_hash,
        miner,
        header,
        hash_function,
    ))
}

//! Core ledger primitives for merkleblock.
//!
//! This crate provides the types a single block of the ledger is made of:
//! - Hash function registry and digests
//! - Ed25519 identities and signatures
//! - Signed transactions
//! - Merkle trees over transactions or text, with inclusion proofs
//! - Blocks with proof-of-work mining
//!
//! Every type round-trips through a JSON record that is checked against its
//! recomputed digests on the way back in.

pub mod block;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod identity;
pub mod merkle;
pub mod pow;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{Block, BlockRecord, DropReason, ValidationDiagnostic, ValidationReport};
pub use crypto::{CryptoError, Keypair, PublicKey, Signature, SignatureScheme, SigningCapability};
pub use error::{ConfigurationError, IntegrityError, LedgerError, Result};
pub use hash::{Digest, HashFunction, SEPARATOR};
pub use identity::{Identity, Party};
pub use merkle::{Combiner, LeafItem, MerkleProof, MerkleTree, MerkleTreeRecord};
pub use pow::{CancellationFlag, MiningConfig, MiningError, MiningOutcome, Target};
pub use transaction::{SigningPolicy, Transaction, TransactionError, TransactionRecord};

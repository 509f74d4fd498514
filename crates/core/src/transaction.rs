//! Transaction types and signing.

use crate::crypto::{PublicKey, Signature, SignatureScheme, SigningCapability};
use crate::error::{decode_record, IntegrityError, Result};
use crate::hash::{canonical_join, Digest, HashFunction};
use crate::identity::Party;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during transaction operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("signer key does not match the transaction sender")]
    SignerMismatch,
    #[error("transaction is already signed")]
    AlreadySigned,
}

/// What happens when a signed transaction is signed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningPolicy {
    /// A new signature silently replaces the old one.
    #[default]
    AllowResign,
    /// A transaction can be signed once.
    SingleSign,
}

/// A transfer of `amount` from `sender` to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Sender's public key.
    pub sender: PublicKey,
    /// Recipient's public key.
    pub recipient: PublicKey,
    /// Value to transfer.
    pub amount: u64,
    /// Seconds since the ledger epoch.
    pub timestamp: u64,
    /// Hash function used for the signing digest.
    pub hash_function: HashFunction,
    /// Scheme the signature belongs to.
    pub signature_scheme: SignatureScheme,
    /// Sender's signature, unset until signed.
    pub signature: Option<Signature>,
}

/// Persisted form of a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionRecord {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    pub timestamp: u64,
    pub hash_function: String,
    pub signature_scheme: String,
    pub signature: Option<String>,
}

impl Transaction {
    /// Create a new unsigned transaction hashed with the default function.
    ///
    /// Only the parties' keys are kept; display names stay with the caller.
    pub fn new(sender: &Party, recipient: &Party, amount: u64, timestamp: u64) -> Self {
        Self {
            sender: sender.public_key.clone(),
            recipient: recipient.public_key.clone(),
            amount,
            timestamp,
            hash_function: HashFunction::default(),
            signature_scheme: SignatureScheme::default(),
            signature: None,
        }
    }

    /// Use a different hash function for the signing digest.
    pub fn with_hash_function(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;
        self
    }

    /// The hash pre-image: sender, recipient, timestamp, amount and hash function.
    pub fn canonical_encoding(&self) -> String {
        canonical_join(&[
            self.sender.to_hex(),
            self.recipient.to_hex(),
            self.timestamp.to_string(),
            self.amount.to_string(),
            self.hash_function.name().to_string(),
        ])
    }

    /// Digest of the canonical encoding, recomputed from the current fields.
    pub fn digest(&self) -> Digest {
        self.hash_function.digest_str(&self.canonical_encoding())
    }

    /// Whether a signature has been attached.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Sign under the default [`SigningPolicy`].
    pub fn sign(&mut self, signer: &impl SigningCapability) -> std::result::Result<(), TransactionError> {
        self.sign_with(signer, SigningPolicy::default())
    }

    /// Sign with the sender's signing capability.
    pub fn sign_with(
        &mut self,
        signer: &impl SigningCapability,
        policy: SigningPolicy,
    ) -> std::result::Result<(), TransactionError> {
        if signer.public_key() != &self.sender {
            return Err(TransactionError::SignerMismatch);
        }
        if policy == SigningPolicy::SingleSign && self.is_signed() {
            return Err(TransactionError::AlreadySigned);
        }
        self.signature_scheme = signer.scheme();
        self.signature = Some(signer.sign_digest(&self.digest()));
        Ok(())
    }

    /// Create a signed transaction.
    pub fn signed(mut self, signer: &impl SigningCapability) -> std::result::Result<Self, TransactionError> {
        self.sign(signer)?;
        Ok(self)
    }

    /// Check a signature over the current field values.
    ///
    /// `None` falls back to the embedded signature or sender key. An unsigned
    /// transaction never validates.
    pub fn validate_signature(
        &self,
        signature: Option<&Signature>,
        sender: Option<&PublicKey>,
    ) -> bool {
        let Some(signature) = signature.or(self.signature.as_ref()) else {
            return false;
        };
        let sender = sender.unwrap_or(&self.sender);
        self.signature_scheme
            .verify(sender, &self.digest(), signature)
    }

    /// Check the embedded signature against the embedded sender key.
    pub fn verify(&self) -> bool {
        self.validate_signature(None, None)
    }

    /// Convert to the persisted form.
    pub fn to_record(&self) -> TransactionRecord {
        TransactionRecord {
            sender: self.sender.to_hex(),
            recipient: self.recipient.to_hex(),
            amount: self.amount,
            timestamp: self.timestamp,
            hash_function: self.hash_function.name().to_string(),
            signature_scheme: self.signature_scheme.name().to_string(),
            signature: self.signature.map(|s| s.to_hex()),
        }
    }

    /// Rebuild a transaction from its record. Unparseable fields are integrity errors.
    pub fn from_record(record: &TransactionRecord) -> Result<Self> {
        const ENTITY: &str = "transaction";
        let malformed = |e: &dyn std::fmt::Display| IntegrityError::malformed(ENTITY, e);

        let sender = PublicKey::from_hex(&record.sender).map_err(|e| malformed(&e))?;
        let recipient = PublicKey::from_hex(&record.recipient).map_err(|e| malformed(&e))?;
        let hash_function = record
            .hash_function
            .parse::<HashFunction>()
            .map_err(|e| malformed(&e))?;
        let signature_scheme = record
            .signature_scheme
            .parse::<SignatureScheme>()
            .map_err(|e| malformed(&e))?;
        let signature = record
            .signature
            .as_deref()
            .map(Signature::from_hex)
            .transpose()
            .map_err(|e| malformed(&e))?;

        Ok(Self {
            sender,
            recipient,
            amount: record.amount,
            timestamp: record.timestamp,
            hash_function,
            signature_scheme,
            signature,
        })
    }

    /// Serialize to a JSON record.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// Parse a JSON record. Wrong shapes are integrity errors.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: TransactionRecord = decode_record("transaction", json)?;
        Self::from_record(&record)
    }
}

//! Ed25519 signing capability for transaction authors.
//!
//! The ledger never touches private material directly: it hands a digest to a
//! [`SigningCapability`] and checks results through a [`SignatureScheme`].

use crate::error::ConfigurationError;
use crate::hash::Digest;
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// A cryptographic signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSignature)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A public key for signature verification.
#[derive(Clone)]
pub struct PublicKey(pub VerifyingKey);

impl PublicKey {
    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Lowercase hex of the compressed point, the key's canonical form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Parse from a hex string. Fails for strings that do not decode to a curve point.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&arr)
            .map(PublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Verify a signature against this public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        let sig = DalekSignature::from_bytes(&signature.0);
        self.0
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..8]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for PublicKey {}

/// Supported signature schemes, named in transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureScheme {
    #[default]
    Ed25519,
}

impl SignatureScheme {
    /// The record name of the scheme.
    pub fn name(self) -> &'static str {
        match self {
            SignatureScheme::Ed25519 => "ed25519",
        }
    }

    /// Check `signature` over `digest` against `public_key`.
    pub fn verify(self, public_key: &PublicKey, digest: &Digest, signature: &Signature) -> bool {
        match self {
            SignatureScheme::Ed25519 => public_key.verify(digest.as_bytes(), signature).is_ok(),
        }
    }
}

impl FromStr for SignatureScheme {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(SignatureScheme::Ed25519),
            _ => Err(ConfigurationError::UnknownSignatureScheme(s.to_string())),
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that holds private signing material for one public key.
pub trait SigningCapability {
    /// The scheme the produced signatures belong to.
    fn scheme(&self) -> SignatureScheme;

    /// The public key matching the private material.
    fn public_key(&self) -> &PublicKey;

    /// Sign a message digest.
    fn sign_digest(&self, digest: &Digest) -> Signature;
}

/// A keypair for signing and verification.
pub struct Keypair {
    signing_key: SigningKey,
    pub public_key: PublicKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Create a keypair from a private key (32 bytes).
    pub fn from_private_key(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            public_key: PublicKey(verifying_key),
        }
    }

    /// Get the private key bytes.
    pub fn private_key(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature(sig.to_bytes())
    }

    /// Verify a signature against our public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        self.public_key.verify(message, signature)
    }
}

impl SigningCapability for Keypair {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Ed25519
    }

    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn sign_digest(&self, digest: &Digest) -> Signature {
        self.sign(digest.as_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashFunction;

    #[test]
    fn test_sign_and_verify() {
        let kp = Keypair::generate();
        let message = b"hello world";
        let sig = kp.sign(message);
        assert!(kp.verify(message, &sig).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"hello");
        assert!(kp.verify(b"world", &sig).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let sig = kp1.sign(b"hello");
        assert!(kp2.verify(b"hello", &sig).is_err());
    }

    #[test]
    fn test_keypair_from_private_key() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::from_private_key(&kp1.private_key());
        assert_eq!(kp1.public_key, kp2.public_key);
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let kp = Keypair::from_private_key(&[7u8; 32]);
        let parsed = PublicKey::from_hex(&kp.public_key.to_hex()).unwrap();
        assert_eq!(parsed, kp.public_key);
        assert_eq!(PublicKey::from_hex("zz"), Err(CryptoError::InvalidPublicKey));
        assert_eq!(PublicKey::from_hex("abcd"), Err(CryptoError::InvalidPublicKey));
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"payload");
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);
        assert_eq!(Signature::from_hex("00ff"), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn test_scheme_verifies_digest() {
        let kp = Keypair::generate();
        let digest = HashFunction::Sha256.digest(b"transfer");
        let sig = kp.sign_digest(&digest);
        assert!(kp.scheme().verify(&kp.public_key, &digest, &sig));

        let other = HashFunction::Sha256.digest(b"transfer!");
        assert!(!kp.scheme().verify(&kp.public_key, &other, &sig));
    }

    #[test]
    fn test_scheme_names() {
        assert_eq!("ED25519".parse::<SignatureScheme>().unwrap(), SignatureScheme::Ed25519);
        assert!(matches!(
            "ecdsa".parse::<SignatureScheme>(),
            Err(ConfigurationError::UnknownSignatureScheme(_))
        ));
    }
}

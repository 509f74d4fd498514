//! Named parties taking part in transfers.

use crate::crypto::{Keypair, PublicKey, Signature, SignatureScheme, SigningCapability};
use crate::hash::Digest;

/// A party that holds private signing material under a display name.
#[derive(Debug)]
pub struct Identity {
    name: String,
    keypair: Keypair,
}

impl Identity {
    /// Create an identity with a freshly generated keypair.
    pub fn generate(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keypair: Keypair::generate(),
        }
    }

    /// Create an identity from a fixed private key, giving reproducible keys.
    pub fn from_private_key(name: impl Into<String>, private_key: &[u8; 32]) -> Self {
        Self {
            name: name.into(),
            keypair: Keypair::from_private_key(private_key),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The verify-only view of this identity, safe to hand to others.
    pub fn party(&self) -> Party {
        Party::new(self.name.clone(), self.keypair.public_key.clone())
    }
}

impl SigningCapability for Identity {
    fn scheme(&self) -> SignatureScheme {
        self.keypair.scheme()
    }

    fn public_key(&self) -> &PublicKey {
        &self.keypair.public_key
    }

    fn sign_digest(&self, digest: &Digest) -> Signature {
        self.keypair.sign_digest(digest)
    }
}

/// A public key with an optional display name. Can verify, never sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    pub name: String,
    pub public_key: PublicKey,
}

impl Party {
    pub fn new(name: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            name: name.into(),
            public_key,
        }
    }

    /// A party known only by its key.
    pub fn anonymous(public_key: PublicKey) -> Self {
        Self::new(String::new(), public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashFunction;

    #[test]
    fn test_identity_party_shares_key() {
        let me = Identity::generate("me");
        let party = me.party();
        assert_eq!(party.name, "me");
        assert_eq!(&party.public_key, me.public_key());
    }

    #[test]
    fn test_fixed_key_is_reproducible() {
        let a = Identity::from_private_key("a", &[1u8; 32]);
        let b = Identity::from_private_key("b", &[1u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_identity_signs_for_its_party() {
        let me = Identity::generate("me");
        let digest = HashFunction::Sha512.digest(b"payload");
        let sig = me.sign_digest(&digest);
        assert!(me.scheme().verify(&me.party().public_key, &digest, &sig));
    }

    #[test]
    fn test_anonymous_party() {
        let kp = Keypair::generate();
        let party = Party::anonymous(kp.public_key.clone());
        assert!(party.name.is_empty());
    }
}

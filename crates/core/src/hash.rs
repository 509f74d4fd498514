//! Hash function registry and digest values.
//!
//! The set of usable hash functions is closed: a name either maps to one of
//! the [`HashFunction`] variants or is rejected as a configuration error.

use crate::error::ConfigurationError;
use sha1::Sha1;
use sha2::{Digest as _, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// Field separator used by every canonical encoding.
pub const SEPARATOR: char = '$';

/// The allow-list of secure hash functions, ordered by output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HashFunction {
    Sha1,
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashFunction {
    /// Every supported hash function.
    pub const ALL: [HashFunction; 5] = [
        HashFunction::Sha1,
        HashFunction::Sha224,
        HashFunction::Sha256,
        HashFunction::Sha384,
        HashFunction::Sha512,
    ];

    /// The registry name, as it appears in canonical encodings and records.
    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Sha1 => "sha1",
            HashFunction::Sha224 => "sha224",
            HashFunction::Sha256 => "sha256",
            HashFunction::Sha384 => "sha384",
            HashFunction::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashFunction::Sha1 => 20,
            HashFunction::Sha224 => 28,
            HashFunction::Sha256 => 32,
            HashFunction::Sha384 => 48,
            HashFunction::Sha512 => 64,
        }
    }

    /// Digest length in bits.
    pub fn output_bits(self) -> usize {
        self.output_len() * 8
    }

    /// Hash arbitrary bytes.
    pub fn digest(self, data: &[u8]) -> Digest {
        let bytes = match self {
            HashFunction::Sha1 => Sha1::digest(data).to_vec(),
            HashFunction::Sha224 => Sha224::digest(data).to_vec(),
            HashFunction::Sha256 => Sha256::digest(data).to_vec(),
            HashFunction::Sha384 => Sha384::digest(data).to_vec(),
            HashFunction::Sha512 => Sha512::digest(data).to_vec(),
        };
        Digest(bytes)
    }

    /// Hash the UTF-8 bytes of a canonical string.
    pub fn digest_str(self, data: &str) -> Digest {
        self.digest(data.as_bytes())
    }
}

impl FromStr for HashFunction {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        HashFunction::ALL
            .into_iter()
            .find(|hf| hf.name() == lowered)
            .ok_or_else(|| ConfigurationError::UnknownHashFunction(s.to_string()))
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A digest produced by one of the registered hash functions.
///
/// The length depends on the function that produced it (20 to 64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the digest holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex, the form used inside canonical encodings.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Digest({})", &hex[..hex.len().min(8)])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Join canonical fields with [`SEPARATOR`].
pub fn canonical_join<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(field.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            HashFunction::Sha256.digest_str("hello").to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(
            HashFunction::Sha1.digest_str("hello").to_hex(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
        assert_eq!(
            HashFunction::Sha256.digest_str("hello!").to_hex(),
            "ce06092fb948d9ffac7d1a376e404b26b7575bcc11ee05a4615fef4fec3a308b"
        );
    }

    #[test]
    fn test_output_lengths() {
        for hf in HashFunction::ALL {
            assert_eq!(hf.digest(b"abc").len(), hf.output_len());
        }
        assert_eq!(HashFunction::Sha1.output_bits(), 160);
        assert_eq!(HashFunction::Sha512.output_bits(), 512);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("sha384".parse::<HashFunction>().unwrap(), HashFunction::Sha384);
        assert_eq!("SHA1".parse::<HashFunction>().unwrap(), HashFunction::Sha1);
        assert!(matches!(
            "md5".parse::<HashFunction>(),
            Err(ConfigurationError::UnknownHashFunction(name)) if name == "md5"
        ));
    }

    #[test]
    fn test_name_roundtrip() {
        for hf in HashFunction::ALL {
            assert_eq!(hf.name().parse::<HashFunction>().unwrap(), hf);
            assert_eq!(hf.to_string(), hf.name());
        }
    }

    #[test]
    fn test_digest_hex_roundtrip() {
        let d = HashFunction::Sha224.digest(b"test data");
        let parsed = Digest::from_hex(&d.to_hex()).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn test_canonical_join() {
        assert_eq!(canonical_join(&["a", "b", "sha256"]), "a$b$sha256");
        assert_eq!(canonical_join(&["only"]), "only");
        assert_eq!(canonical_join::<&str>(&[]), "");
    }

    #[test]
    fn test_default_is_sha256() {
        assert_eq!(HashFunction::default(), HashFunction::Sha256);
    }
}

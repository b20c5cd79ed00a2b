//! Content digests pinning the bytes of a referenced document.
//!
//! Digests are written as `algorithm:hex`, e.g.
//! `sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855`.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest as _, Sha256, Sha512};

use crate::error::{Error, Result};

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    fn size(self) -> usize {
        match self {
            Algorithm::Sha256 => 32,
            Algorithm::Sha512 => 64,
        }
    }

    fn hash(self, content: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => Sha256::digest(content).to_vec(),
            Algorithm::Sha512 => Sha512::digest(content).to_vec(),
        }
    }
}

/// A parsed `algorithm:hex` digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    algorithm: Algorithm,
    bytes: Vec<u8>,
}

impl Digest {
    /// Computes the digest of `content`.
    pub fn of(algorithm: Algorithm, content: &[u8]) -> Self {
        Self {
            algorithm,
            bytes: algorithm.hash(content),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Checks `content`, fetched from `locator`, against this digest.
    pub fn verify(&self, locator: &str, content: &[u8]) -> Result<()> {
        let actual = Digest::of(self.algorithm, content);
        if actual != *self {
            return Err(Error::Integrity {
                locator: locator.to_string(),
                expected: self.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |message: String| Error::InvalidDigest {
            digest: s.to_string(),
            message,
        };
        let (algorithm, encoded) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <algorithm>:<hex>".to_string()))?;
        let algorithm = match algorithm {
            "sha256" => Algorithm::Sha256,
            "sha512" => Algorithm::Sha512,
            other => return Err(invalid(format!("unsupported algorithm {:?}", other))),
        };
        let bytes = hex::decode(encoded).map_err(|e| invalid(e.to_string()))?;
        if bytes.len() != algorithm.size() {
            return Err(invalid(format!(
                "{} digest must be {} hex characters",
                algorithm.name(),
                algorithm.size() * 2
            )));
        }
        Ok(Self { algorithm, bytes })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.name(), hex::encode(&self.bytes))
    }
}

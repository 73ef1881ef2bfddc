//! Content identifiers.
//!
//! A program image is identified by RIPEMD-160 over its SHA-256 digest.
//! The digest is stored in hash order and displayed byte-reversed, `0x`
//! prefixed, the way contract hashes are conventionally written.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScriptHash([u8; 20]);

impl ScriptHash {
    pub const LEN: usize = 20;

    /// Hash of a program image.
    pub fn of(script: &[u8]) -> Self {
        let sha = Sha256::digest(script);
        let rip = Ripemd160::digest(sha);
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&rip);
        Self(bytes)
    }

    /// Wrap raw digest bytes (hash order, not display order).
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Digest bytes in hash order. This is what scripts push.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "0x{}", hex::encode(reversed))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HashParseError {
    #[error("invalid hex in script hash: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("script hash must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

impl FromStr for ScriptHash {
    type Err = HashParseError;

    /// Parse the display form; the `0x` prefix is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(digits)?;
        if bytes.len() != Self::LEN {
            return Err(HashParseError::Length {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        bytes.reverse();
        let mut out = [0u8; Self::LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

/// Interop service identifier: the first four bytes of SHA-256 over the
/// service name, read little-endian.
pub fn interop_hash(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Interop services the reference executor understands.
pub const KNOWN_SYSCALLS: &[&str] = &[
    "System.Contract.Call",
    "System.Runtime.Log",
    "System.Runtime.Notify",
];

/// Name of a known interop service, by identifier.
pub fn syscall_name(id: u32) -> Option<&'static str> {
    KNOWN_SYSCALLS
        .iter()
        .copied()
        .find(|name| interop_hash(name) == id)
}

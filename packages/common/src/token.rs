use std::fmt;

use sha2::{Digest, Sha256};

/// Number of random bytes behind every verification token.
pub const TOKEN_BYTES: usize = 32;

/// A freshly issued email verification secret.
///
/// The raw value only ever travels inside the verification link. Storage keeps
/// the [`TokenHash`] instead.
pub struct VerificationToken(String);

impl VerificationToken {
    /// Generate 32 random bytes, hex-encoded (64 characters).
    pub fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Raw hex value, for building the verification URL.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn hash(&self) -> TokenHash {
        TokenHash::of(&self.0)
    }
}

// Keep the secret out of logs and panics.
impl fmt::Debug for VerificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationToken(..)")
    }
}

/// SHA-256 of a raw token, as 64 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn of(raw: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw.as_bytes())))
    }

    /// Hash a token received from a client, rejecting anything that could not
    /// have been produced by [`VerificationToken::generate`].
    pub fn from_untrusted(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !is_well_formed(raw) {
            return None;
        }
        Some(Self::of(&raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenHash({})", self.0)
    }
}

/// Exactly 64 hex characters.
pub fn is_well_formed(raw: &str) -> bool {
    raw.len() == TOKEN_BYTES * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

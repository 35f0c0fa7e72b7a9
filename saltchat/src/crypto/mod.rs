//! Message transform layer for `SaltChat`.
//!
//! Defines the [`MessageCipher`] trait, the [`Secret`] wrapper, the error
//! types and the [`AuditEvent`]s the transform reports. [`pipeline`] holds
//! the salted XOR transform itself.
//!
//! # Security
//!
//! The transform is a demo, not a security boundary. Repeating-key XOR is
//! breakable with known plaintext or frequency analysis, and the integrity
//! hash is computed over the plaintext, so anyone who guesses a message can
//! forge a valid hash. It only detects corruption and wrong keys.

pub mod pipeline;

use std::fmt;

use saltchat_proto::envelope::Metadata;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Errors raised while validating user-supplied credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Display name or secret is empty.
    #[error("enter your name and secret key")]
    MissingCredentials,

    /// A session is already running; exit before starting another.
    #[error("a session is already active")]
    AlreadyStarted,
}

/// Reasons a plaintext could not be masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Masking produced a UTF-16 surrogate half with no partner, which has
    /// no UTF-8 form. Only possible with a non-ASCII secret.
    #[error("masked text contains a lone surrogate; try another secret")]
    LoneSurrogate,
}

/// Reasons a ciphertext could not be turned back into plaintext.
///
/// All variants collapse to the same placeholder in the UI; the distinction
/// is kept for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The ciphertext is not valid base64, or its bytes are not UTF-8.
    #[error("ciphertext is not valid base64 of UTF-8 text")]
    MalformedEncoding,

    /// The unmasked text does not start with the advertised salt.
    #[error("salt mismatch (wrong key?)")]
    SaltMismatch,

    /// The recovered plaintext does not hash to the advertised digest.
    #[error("hash mismatch (corrupted message or wrong key)")]
    HashMismatch,

    /// The unmasked text after the salt holds a lone surrogate.
    #[error("unmasked text is not valid UTF-16 (corrupted message or wrong key)")]
    LoneSurrogate,
}

/// Security events reported on the [`AUDIT_TARGET`] tracing target.
///
/// Names are stable so log processors can match on the `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    EncryptionStarted,
    EncryptionCompleted,
    EncryptionFailed,
    DecryptionStarted,
    DecryptionCompleted,
    MalformedEncoding,
    SaltMismatch,
    HashMismatch,
    InvalidText,
}

/// Tracing target carrying [`AuditEvent`]s.
pub const AUDIT_TARGET: &str = "saltchat::audit";

impl AuditEvent {
    /// Stable event name, as written to the `event` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EncryptionStarted => "ENCRYPTION_STARTED",
            Self::EncryptionCompleted => "ENCRYPTION_COMPLETED",
            Self::EncryptionFailed => "ENCRYPTION_FAILED",
            Self::DecryptionStarted => "DECRYPTION_STARTED",
            Self::DecryptionCompleted => "DECRYPTION_COMPLETED",
            Self::MalformedEncoding => "MALFORMED_ENCODING",
            Self::SaltMismatch => "SALT_MISMATCH",
            Self::HashMismatch => "HASH_MISMATCH",
            Self::InvalidText => "INVALID_TEXT",
        }
    }

    /// Whether the event reports a failed operation.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::EncryptionFailed
                | Self::MalformedEncoding
                | Self::SaltMismatch
                | Self::HashMismatch
                | Self::InvalidText
        )
    }

    /// Emit the event. Failures log at `warn`, the rest at `debug` or `info`.
    pub fn emit(self, salt: &str) {
        let event = self.as_str();
        match self {
            Self::EncryptionStarted | Self::DecryptionStarted => {
                tracing::debug!(target: AUDIT_TARGET, event, salt, "security event");
            }
            Self::EncryptionCompleted | Self::DecryptionCompleted => {
                tracing::info!(target: AUDIT_TARGET, event, salt, "security event");
            }
            _ => tracing::warn!(target: AUDIT_TARGET, event, salt, "security event"),
        }
    }
}

impl From<DecodeError> for AuditEvent {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::MalformedEncoding => Self::MalformedEncoding,
            DecodeError::SaltMismatch => Self::SaltMismatch,
            DecodeError::HashMismatch => Self::HashMismatch,
            DecodeError::LoneSurrogate => Self::InvalidText,
        }
    }
}

/// Shared secret entered at login.
///
/// Guaranteed non-empty. Never serialized, never logged (its `Debug` output
/// is redacted) and wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret string, rejecting the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingCredentials`] if `secret` is empty.
    pub fn new(secret: impl Into<String>) -> Result<Self, ValidationError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        Ok(Self(secret))
    }

    /// UTF-16 code units of the key, the unit the mask cycles over.
    #[must_use]
    pub fn utf16_units(&self) -> Zeroizing<Vec<u16>> {
        Zeroizing::new(self.0.encode_utf16().collect())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Output of [`MessageCipher::encode`]: what goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Base64 masked ciphertext.
    pub ciphertext: String,
    /// Salt and plaintext hash.
    pub metadata: Metadata,
}

/// Trait for turning chat text into wire payloads and back.
///
/// # Invariant
///
/// `decode` either returns exactly the plaintext passed to `encode` or an
/// error. It never returns altered text.
///
/// # Implementors
///
/// - [`pipeline::SaltedXor`]: salt + XOR + base64 + SHA-256 check
pub trait MessageCipher: Send + Sync {
    /// Encode a plaintext message.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if the masked text has no UTF-8 form.
    fn encode(&self, plaintext: &str) -> Result<Sealed, EncodeError>;

    /// Decode a ciphertext produced by a peer holding the same secret.
    fn decode(&self, ciphertext: &str, metadata: &Metadata) -> Result<String, DecodeError>;
}

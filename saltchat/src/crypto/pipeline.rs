//! Salted XOR pipeline.
//!
//! ```text
//! encode: salt ‖ plaintext ──UTF-16──► XOR(secret) ──UTF-8──► base64 ──► ciphertext
//!         SHA-256(UTF-8 plaintext) ──► hex ──► metadata.hash
//! decode: ciphertext ──base64⁻¹──► UTF-8 ──► UTF-16 ──► XOR(secret)
//!         ──► check salt prefix ──► strip salt ──► check hash ──► plaintext
//! ```
//!
//! The mask works on UTF-16 code units, cycling the secret's own UTF-16
//! units, and the masked text travels as base64 of its UTF-8 bytes. This is
//! what browser peers do, so any text round-trips between them and this
//! client. A mask can turn a character into half of a surrogate pair; such
//! text has no UTF-8 form and is reported as [`EncodeError::LoneSurrogate`]
//! or [`DecodeError::LoneSurrogate`]. ASCII secrets never produce one.
//!
//! Every call reports [`AuditEvent`]s on the audit tracing target. Neither
//! the plaintext nor the secret is logged.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::Rng;
use rand::distr::Alphanumeric;
use saltchat_proto::envelope::Metadata;
use sha2::{Digest, Sha256};

use super::{AuditEvent, DecodeError, EncodeError, MessageCipher, Sealed, Secret};

/// Number of salt characters prepended to every plaintext.
pub const SALT_LEN: usize = 8;

/// The salted XOR cipher bound to one session secret.
#[derive(Debug, Clone)]
pub struct SaltedXor {
    secret: Secret,
}

impl SaltedXor {
    /// Create a cipher for the given secret.
    #[must_use]
    pub const fn new(secret: Secret) -> Self {
        Self { secret }
    }
}

impl MessageCipher for SaltedXor {
    fn encode(&self, plaintext: &str) -> Result<Sealed, EncodeError> {
        encode(plaintext, &self.secret)
    }

    fn decode(&self, ciphertext: &str, metadata: &Metadata) -> Result<String, DecodeError> {
        decode(ciphertext, &self.secret, metadata)
    }
}

/// Encode `plaintext` under `secret` with a fresh random salt.
///
/// # Errors
///
/// Returns [`EncodeError::LoneSurrogate`] if the masked text has no UTF-8
/// form. Only secrets with a code unit at or above U+0800 can cause it.
pub fn encode(plaintext: &str, secret: &Secret) -> Result<Sealed, EncodeError> {
    encode_with_salt(plaintext, secret, generate_salt())
}

/// Decode a ciphertext, checking the salt prefix and the plaintext hash.
///
/// # Errors
///
/// - [`DecodeError::MalformedEncoding`] if `ciphertext` is not base64 of
///   UTF-8 text.
/// - [`DecodeError::SaltMismatch`] if the unmasked text does not start with
///   `metadata.salt`, which almost always means a wrong secret.
/// - [`DecodeError::LoneSurrogate`] if the text after the salt is not valid
///   UTF-16.
/// - [`DecodeError::HashMismatch`] if the recovered plaintext does not match
///   `metadata.hash`.
pub fn decode(ciphertext: &str, secret: &Secret, metadata: &Metadata) -> Result<String, DecodeError> {
    AuditEvent::DecryptionStarted.emit(&metadata.salt);
    let result = unmask(ciphertext, secret, metadata);
    match &result {
        Ok(_) => AuditEvent::DecryptionCompleted.emit(&metadata.salt),
        Err(err) => AuditEvent::from(*err).emit(&metadata.salt),
    }
    result
}

/// Hex SHA-256 digest of a plaintext, as carried in `metadata.hash`.
#[must_use]
pub fn plaintext_hash(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Draw a [`SALT_LEN`]-character alphanumeric salt.
#[must_use]
pub fn generate_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

fn encode_with_salt(plaintext: &str, secret: &Secret, salt: String) -> Result<Sealed, EncodeError> {
    AuditEvent::EncryptionStarted.emit(&salt);
    let mut units: Vec<u16> = salt.encode_utf16().chain(plaintext.encode_utf16()).collect();
    xor_in_place(&mut units, &secret.utf16_units());

    let Ok(masked) = String::from_utf16(&units) else {
        AuditEvent::EncryptionFailed.emit(&salt);
        return Err(EncodeError::LoneSurrogate);
    };

    AuditEvent::EncryptionCompleted.emit(&salt);
    Ok(Sealed {
        ciphertext: BASE64.encode(masked.as_bytes()),
        metadata: Metadata {
            salt,
            hash: plaintext_hash(plaintext),
        },
    })
}

fn unmask(ciphertext: &str, secret: &Secret, metadata: &Metadata) -> Result<String, DecodeError> {
    let bytes = BASE64
        .decode(ciphertext)
        .map_err(|_| DecodeError::MalformedEncoding)?;
    let masked = String::from_utf8(bytes).map_err(|_| DecodeError::MalformedEncoding)?;

    let mut units: Vec<u16> = masked.encode_utf16().collect();
    xor_in_place(&mut units, &secret.utf16_units());

    let salt: Vec<u16> = metadata.salt.encode_utf16().collect();
    let Some(candidate) = units.strip_prefix(salt.as_slice()) else {
        return Err(DecodeError::SaltMismatch);
    };

    let plaintext = String::from_utf16(candidate).map_err(|_| DecodeError::LoneSurrogate)?;
    if plaintext_hash(&plaintext) != metadata.hash {
        return Err(DecodeError::HashMismatch);
    }
    Ok(plaintext)
}

/// XOR `data` with `key`, repeating the key as needed. `key` is non-empty
/// because it comes from a [`Secret`].
fn xor_in_place(data: &mut [u16], key: &[u16]) {
    for (unit, k) in data.iter_mut().zip(key.iter().cycle()) {
        *unit ^= k;
    }
}

//! Per-login session state.

use crate::crypto::pipeline::SaltedXor;
use crate::crypto::{MessageCipher, Secret, ValidationError};

/// Who the user is and which cipher they speak for the length of a login.
///
/// Created at Start, owned by the lifecycle, dropped at exit. The display
/// name travels in plaintext on every message; the secret lives only inside
/// the cipher and is wiped when the session is dropped.
#[derive(Debug)]
pub struct Session<C = SaltedXor> {
    display_name: String,
    cipher: C,
}

impl Session<SaltedXor> {
    /// Validate login input and build a session around a [`SaltedXor`].
    ///
    /// The display name is trimmed; the secret is used as typed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingCredentials`] if the trimmed name
    /// or the secret is empty.
    pub fn new(display_name: &str, secret: &str) -> Result<Self, ValidationError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        let secret = Secret::new(secret)?;
        Ok(Self::with_cipher(display_name, SaltedXor::new(secret)))
    }
}

impl<C: MessageCipher> Session<C> {
    /// Build a session around an arbitrary cipher.
    pub fn with_cipher(display_name: impl Into<String>, cipher: C) -> Self {
        Self {
            display_name: display_name.into(),
            cipher,
        }
    }

    /// The local display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The session cipher.
    pub const fn cipher(&self) -> &C {
        &self.cipher
    }
}

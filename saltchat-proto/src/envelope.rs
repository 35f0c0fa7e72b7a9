//! Chat envelope carried in WebSocket text frames.
//!
//! One envelope is sent per chat message. Field names on the wire are the
//! ones existing browser peers already speak (`nombre`, `cifrado`,
//! `metadatos`), so they are renamed at the serde layer and the Rust side
//! uses descriptive names.
//!
//! Inbound frames go through [`Frame::parse`], which validates the schema
//! and yields either a [`Frame::Chat`] or a [`Frame::Unknown`]. Callers never
//! poke at raw JSON fields.

use serde::{Deserialize, Serialize};

/// Integrity metadata attached to every ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Random prefix mixed into the plaintext before masking.
    pub salt: String,
    /// Hex SHA-256 digest of the original (unsalted) plaintext.
    pub hash: String,
}

/// A chat message as it travels between clients.
///
/// The relay forwards envelopes verbatim; only clients holding the shared
/// secret can recover the plaintext from `ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender display name, in plaintext.
    #[serde(rename = "nombre")]
    pub sender_name: String,
    /// Base64 masked ciphertext.
    #[serde(rename = "cifrado")]
    pub ciphertext: String,
    /// Salt and integrity hash for `ciphertext`.
    #[serde(rename = "metadatos")]
    pub metadata: Metadata,
}

/// Error type for envelope serialization.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Envelope {
    /// Serializes the envelope into the JSON text sent on the channel.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Serialization`] if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Why an inbound frame was not recognized as a chat envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownReason {
    /// The frame is not valid JSON or lacks a required field.
    Schema(String),
    /// The sender name or ciphertext is present but empty.
    EmptyField(&'static str),
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A well-formed chat envelope.
    Chat(Envelope),
    /// Anything else: system frames, garbage, partial envelopes.
    Unknown(UnknownReason),
}

impl Frame {
    /// Parses one text frame received from the channel.
    ///
    /// Never fails: frames that do not match the envelope schema come back
    /// as [`Frame::Unknown`] so the caller can drop them without treating
    /// them as errors.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(e) => e,
            Err(e) => return Self::Unknown(UnknownReason::Schema(e.to_string())),
        };
        if envelope.sender_name.is_empty() {
            return Self::Unknown(UnknownReason::EmptyField("nombre"));
        }
        if envelope.ciphertext.is_empty() {
            return Self::Unknown(UnknownReason::EmptyField("cifrado"));
        }
        Self::Chat(envelope)
    }
}

//! `SaltChat` relay server library.
//!
//! Exposes the relay server for use in tests and embedding. The relay
//! accepts WebSocket connections at `/ws` and broadcasts every frame it
//! receives, verbatim, to the connected clients. It never inspects the
//! chat envelope and never sees a plaintext or a secret.

pub mod config;
pub mod relay;

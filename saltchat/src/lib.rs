//! `SaltChat`: terminal chat over a WebSocket relay with a salted XOR
//! message transform.
//!
//! The transform is a toy. It hides messages from casual observers of the
//! relay and detects a wrong key, nothing more.

pub mod app;
pub mod config;
pub mod crypto;
pub mod lifecycle;
pub mod net;
pub mod session;
pub mod transport;
pub mod ui;

//! Shared wire definitions for the `SaltChat` envelope format.

pub mod envelope;

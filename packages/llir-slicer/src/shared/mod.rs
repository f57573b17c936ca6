//! Cross-feature types shared by every analysis stage: the error taxonomy,
//! the layered configuration, and the host-provided IR adapter.

pub mod config;
pub mod error;
pub mod ir;

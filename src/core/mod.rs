//! Core library components.
//!
//! Format parsing, the marker and envelope protocols, public-key providers,
//! and the engine that ties them together.

pub mod cipher;
pub mod config;
pub mod constants;
pub mod detect;
pub mod engine;
pub mod envelope;
pub mod marker;
pub mod metadata;
pub mod parser;
pub mod validation;

//! Shared domain types for trainerbot.
//!
//! Module identities and bindings, per-chat session state, the engine
//! contract's wire bodies, update-feed bodies, configuration, and error
//! types.
//!
//! Zero infrastructure dependencies: only serde, serde_json, chrono and thiserror.

pub mod config;
pub mod engine;
pub mod error;
pub mod module;
pub mod session;
pub mod update;

//! Infrastructure layer for trainerbot.
//!
//! Implements the ports defined in `trainerbot-core`: the reqwest-based
//! module backend and trainer client, the Telegram Bot API transport, and
//! the filesystem module catalog. Also owns configuration loading and bot
//! token resolution.

pub mod backend;
pub mod config;
pub mod filesystem;
pub mod telegram;

//! Discovery, session state and dispatch logic for trainerbot.
//!
//! This crate defines the ports (backend, trainer, chat transport and module
//! catalog traits) that trainerbot-infra implements, plus everything that
//! runs on top of them. It depends only on `trainerbot-types` -- never on
//! `trainerbot-infra` or any HTTP or filesystem crate.

pub mod backend;
pub mod discovery;
pub mod dispatch;
pub mod polling;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

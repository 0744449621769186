//! Command-line front end for the Sahayak teaching assistant.
//!
//! Transport and stream decoding live in [`sahayak_api`]; this crate adds
//! environment configuration, tracing setup and multi-turn chat state.

pub mod chat;
pub mod config;
pub mod echo;
pub mod logging;

pub use chat::ChatSession;
pub use config::EnvConfig;
pub use echo::TokenEcho;

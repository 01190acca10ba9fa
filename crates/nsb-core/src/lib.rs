//! Core domain + application logic for the number search bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the SQL
//! store live behind ports (traits) implemented in adapter crates.

pub mod broadcast;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod logging;
pub mod lookup;
pub mod normalize;
pub mod ports;
pub mod ratelimit;
pub mod store;

pub use errors::{Error, Result};

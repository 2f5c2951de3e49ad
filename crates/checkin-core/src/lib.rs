//! # checkin-core
//!
//! Core types, traits, configuration, question catalog, and error handling
//! for the checkin bot.

pub mod answer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod message;
pub mod traits;

pub use config::shellexpand;

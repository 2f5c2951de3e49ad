//! # checkin-channels
//!
//! Messaging platform integrations for checkin.

pub mod telegram;
pub mod utils;

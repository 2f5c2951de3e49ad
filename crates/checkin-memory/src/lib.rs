//! # checkin-memory
//!
//! Persistent answer store for checkin (SQLite-backed).

pub mod store;

pub use store::Store;

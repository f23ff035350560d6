//! Gymgate - Gym access control
//!
//! This crate provides the application runtime for the front desk, including:
//! - Member persistence via an embedded redb store
//! - Access decisions built on the `membership` rules
//! - A serial keypad reader feeding an async access console
//! - Configuration loaded once from the store

pub use membership;

// Error types
pub mod types;

// Configuration
pub mod config;

// Member persistence
pub mod store;

// Serial keypad reader
pub mod serial;

// Access decisions
pub mod access;

// Access request consumer
pub mod console;

pub use access::{AccessController, AccessOutcome};
pub use config::{GymConfig, SerialSettings};
pub use types::{Error, Result};

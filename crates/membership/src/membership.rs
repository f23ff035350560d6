//! Membership - Core member model and lifecycle rules
//!
//! This crate contains the pure data structures and date arithmetic behind
//! gym access control. It performs no I/O: every function takes the current
//! date or time as an argument and returns new values.
//!
//! ## Modules
//!
//! - `date` - `YYYY-MM-DD` parsing and formatting
//! - `member` - member records and the freeze state variant
//! - `engine` - expiry, freeze/unfreeze, extension and access classification
//! - `period` - calendar-aware extension periods

mod date;
mod engine;
mod error;
mod member;
mod period;

pub use date::*;
pub use engine::*;
pub use error::*;
pub use member::*;
pub use period::*;

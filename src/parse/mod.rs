//! Parsers for raw listing output.
//!
//! One module per listing format. Line-oriented parsers are lazy and yield
//! [`crate::error::ParseWarning`] for lines they cannot understand instead
//! of failing the whole listing.

pub mod apt;
pub mod history;
pub mod pip;

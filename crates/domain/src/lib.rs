//! # ODataLink Domain
//!
//! Data shapes shared by every ODataLink crate.
//!
//! This crate contains:
//! - The client error taxonomy and `Result` alias
//! - Client configuration structures
//! - The closed `Value` sum type stored in proxy property bags
//! - HTTP wire types, query options and JSON format descriptors
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other ODataLink crates
//! - No I/O
//! - Pure data structures and their formatting rules

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;

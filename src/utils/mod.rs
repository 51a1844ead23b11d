//! Utility modules
//!
//! This module contains utilities and helpers:
//! - Error types and result types
//! - The relaxed literal parser used for command options and literal data

pub mod error;
pub mod literal;

// Re-export commonly used items
pub use error::{DvizError, DvizResult, LoadError, RenderError};
pub use literal::{parse_literal, parse_object_literal, LiteralError};

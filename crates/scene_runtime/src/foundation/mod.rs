//! Foundation module - Core utilities and types
//!
//! - Math types and the node transform
//! - Logging setup

pub mod logging;
pub mod math;

//! Site configuration.
//!
//! Loads and validates the YAML site files that describe routes, timings,
//! router behavior and scripted sessions.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning};
pub use schema::*;
pub use validation::{ValidationResult, Validator, parse_duration, suggest};

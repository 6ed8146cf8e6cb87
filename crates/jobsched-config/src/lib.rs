//! # jobsched Config
//!
//! Configuration management for the jobsched daemon: TOML loading with
//! `${VAR}` substitution, schema defaults and validation.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};

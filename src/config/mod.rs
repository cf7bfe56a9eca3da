//! Configuration management
//!
//! The static network view (links and hosts) and the steering request are
//! read from a TOML file.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

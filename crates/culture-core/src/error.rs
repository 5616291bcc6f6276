//! Error types for the simulation.

use crate::types::OrganismId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid seed: ({x}, {y}) lies outside the seedable interior")]
    InvalidSeed { x: i32, y: i32 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Organism not found: {0}")]
    NotFound(OrganismId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Check that a probability lies in `[0, 1]`.
pub fn check_chance(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )))
    }
}

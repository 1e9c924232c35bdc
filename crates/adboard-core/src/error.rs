//! Error types for `adboard-core`.

use thiserror::Error;

use crate::mapping::ValidationErrors;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed request body: {0}")]
  Malformed(#[from] serde_json::Error),

  #[error("invalid input: {0}")]
  Validation(#[from] ValidationErrors),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Loader errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] eventide_core::Error),

    /// A reaction map key that does not parse as a state id
    #[error("bad state key {0:?}")]
    BadStateKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Registry errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Not registered: {0}")]
    NotFound(String),

    #[error("Invalid id: {0:?}")]
    InvalidId(String),
}

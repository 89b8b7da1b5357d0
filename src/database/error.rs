use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Errors raised by the storage traits, independent of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("{0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Maps a driver error, turning duplicate-key failures into `Duplicate(duplicate_msg)`.
    pub fn from_mongo(err: mongodb::error::Error, duplicate_msg: &str) -> Self {
        if is_duplicate_key(&err) {
            StoreError::Duplicate(duplicate_msg.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

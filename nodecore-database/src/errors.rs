use crate::key::DbKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key {0} not found")]
    KeyNotFound(DbKey),

    #[error("key {0} already exists")]
    KeyAlreadyExists(String),

    #[error("database error: {0}")]
    DbError(#[from] rocksdb::Error),

    #[error("deserialization error: {0}")]
    DeserializationError(#[from] Box<bincode::ErrorKind>),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type StoreResultEmptyTuple = StoreResult<()>;

pub trait StoreResultExtensions<T> {
    /// Converts a not-found error into `None`, leaving every other error as-is.
    fn unwrap_option(self) -> Result<Option<T>, StoreError>;
}

impl<T> StoreResultExtensions<T> for StoreResult<T> {
    fn unwrap_option(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::KeyNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

pub trait StoreResultEmptyTupleExtensions {
    /// Swallows an already-exists error, treating a redundant write as a no-op.
    fn unwrap_and_ignore_key_already_exists(self);
}

impl StoreResultEmptyTupleExtensions for StoreResultEmptyTuple {
    fn unwrap_and_ignore_key_already_exists(self) {
        match self {
            Ok(()) => {}
            Err(StoreError::KeyAlreadyExists(_)) => {}
            Err(err) => panic!("unexpected store error: {err}"),
        }
    }
}

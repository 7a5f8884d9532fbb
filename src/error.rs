use thiserror::Error;

use crate::model::Operation;

/// Errors from the overlay slot storage.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("overlay store lock poisoned")]
  Poisoned,
}

/// Errors from calls against the remote collection.
///
/// The display text names the failing operation, e.g. `Create failed: 500`.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("{op} failed: {status}")]
  Status { op: Operation, status: u16 },

  #[error("{op} failed: {source}")]
  Transport {
    op: Operation,
    #[source]
    source: reqwest::Error,
  },

  #[error("{op} failed: invalid response: {reason}")]
  Decode { op: Operation, reason: String },

  #[error("invalid collection url {url}: {reason}")]
  InvalidUrl { url: String, reason: String },
}

/// Errors surfaced by [`crate::sync::SyncedClient`].
#[derive(Debug, Error)]
pub enum SyncError {
  /// Form input rejected before any network call.
  #[error("{0}")]
  Validation(String),

  #[error(transparent)]
  Remote(#[from] RemoteError),

  /// The remote call succeeded but the overlay could not be persisted.
  #[error("{op} failed: could not save local changes: {source}")]
  Store {
    op: Operation,
    #[source]
    source: StoreError,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_message_names_operation() {
    let err = RemoteError::Status {
      op: Operation::Create,
      status: 500,
    };
    assert_eq!(err.to_string(), "Create failed: 500");
  }

  #[test]
  fn test_validation_message_is_verbatim() {
    let err = SyncError::Validation("Fill all fields before creating".to_string());
    assert_eq!(err.to_string(), "Fill all fields before creating");
  }

  #[test]
  fn test_remote_error_is_transparent() {
    let err: SyncError = RemoteError::Status {
      op: Operation::Delete,
      status: 404,
    }
    .into();
    assert_eq!(err.to_string(), "Delete failed: 404");
  }
}

use thiserror::Error;

/// Failure modes surfaced by the registry and dispatcher.
///
/// Every variant maps to exactly one of the error kinds a caller can expect
/// back from a dispatched call: `Duplicate`/`SchemaInvalid` are registration
/// failures, `NotFound`/`InvalidArgument`/`DeadlineExceeded` are per-call
/// failures a client should treat as retryable-or-not on their own terms,
/// `Internal` is reserved for plugin panics recovered by the dispatcher, and
/// `Unknown` passes a plugin's own error through verbatim.
#[derive(Debug, Error, Clone)]
pub enum Error {
	#[error("plugin already registered: {0}")]
	Duplicate(String),

	#[error("invalid plugin schema for {0}: {1}")]
	SchemaInvalid(String, String),

	#[error("plugin not found: {0}")]
	NotFound(String),

	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("deadline exceeded for {0}")]
	DeadlineExceeded(String),

	#[error("internal error in {0}: plugin panicked")]
	Internal(String),

	#[error("{0}")]
	Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;

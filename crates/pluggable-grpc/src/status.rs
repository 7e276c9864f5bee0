//! Maps [`pluggable_core::Error`] onto the gRPC status vocabulary, per
//! spec §7's error table. Grounded on the Go source's `status.Errorf(codes.*, ...)`
//! call sites scattered through `pkg/server/serve.go` and `pluggable/call.go`.

use pluggable_core::Error;
use tonic::Status;

pub(crate) fn to_status(err: Error) -> Status {
	match err {
		Error::NotFound(key) => Status::not_found(key),
		Error::InvalidArgument(msg) => Status::invalid_argument(msg),
		Error::DeadlineExceeded(key) => Status::deadline_exceeded(key),
		Error::Internal(key) => Status::internal(format!("plugin panicked: {key}")),
		Error::Duplicate(key) => Status::already_exists(key),
		Error::SchemaInvalid(name, msg) => Status::invalid_argument(format!("{name}: {msg}")),
		Error::Unknown(msg) => Status::unknown(msg),
	}
}

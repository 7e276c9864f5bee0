//! A [`tonic::codec::Codec`] whose message type is resolved at dispatch
//! time from a [`MessageDescriptor`] rather than fixed at compile time —
//! the Rust counterpart to the Go source's `dynamicpb.NewMessage(method.Input())`
//! inside `pkg/server/serve.go`'s unary handler.
//!
//! Wire bytes decode straight into a [`DynamicMessage`]; [`crate::server`]
//! bridges that to and from JSON so it can hand the payload to
//! [`pluggable_core::Dispatcher`] unchanged.

use bytes::{Buf, BufMut};
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::Status;

/// Binds the descriptor a call's *incoming* message decodes into. Encoding
/// needs no descriptor of its own — a [`DynamicMessage`] already carries
/// the one it was built against — so a single field covers both the
/// server's request side and the client's response side; each builds this
/// with whichever descriptor it is about to decode.
#[derive(Clone)]
pub(crate) struct DynamicCodec {
	pub decode_into: MessageDescriptor,
}

impl Codec for DynamicCodec {
	type Encode = DynamicMessage;
	type Decode = DynamicMessage;
	type Encoder = DynamicEncoder;
	type Decoder = DynamicDecoder;

	fn encoder(&mut self) -> Self::Encoder {
		DynamicEncoder
	}

	fn decoder(&mut self) -> Self::Decoder {
		DynamicDecoder {
			descriptor: self.decode_into.clone(),
		}
	}
}

pub(crate) struct DynamicEncoder;

impl Encoder for DynamicEncoder {
	type Item = DynamicMessage;
	type Error = Status;

	fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
		item.encode(dst)
			.map_err(|e| Status::internal(format!("failed to encode response: {e}")))
	}
}

pub(crate) struct DynamicDecoder {
	descriptor: MessageDescriptor,
}

impl Decoder for DynamicDecoder {
	type Item = DynamicMessage;
	type Error = Status;

	fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
		if !src.has_remaining() {
			return Ok(None);
		}
		DynamicMessage::decode(self.descriptor.clone(), src)
			.map(Some)
			.map_err(|e| Status::invalid_argument(format!("failed to decode request: {e}")))
	}
}

/// Converts a decoded [`DynamicMessage`] into the JSON bytes
/// [`pluggable_core::Dispatcher::dispatch`] expects as its payload —
/// protobuf-JSON semantics, matching the Go source's `protojson.Marshal`.
pub(crate) fn message_to_json(message: &DynamicMessage) -> Result<Vec<u8>, Status> {
	serde_json::to_vec(message).map_err(|e| Status::internal(format!("failed to encode JSON bridge: {e}")))
}

/// Converts the dispatcher's JSON output bytes into a [`DynamicMessage`]
/// built against `descriptor`, mirroring the Go source's
/// `protojson.Unmarshal(resp, output)`.
pub(crate) fn json_to_message(bytes: &[u8], descriptor: MessageDescriptor) -> Result<DynamicMessage, Status> {
	let value: serde_json::Value =
		serde_json::from_slice(bytes).map_err(|e| Status::internal(format!("plugin returned invalid JSON: {e}")))?;
	DynamicMessage::deserialize(descriptor, &value)
		.map_err(|e| Status::internal(format!("failed to decode JSON bridge: {e}")))
}

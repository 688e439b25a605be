use crate::{PeerId, StreamId};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("invalid payload")]
	InvalidPayload,

	#[error("peer {peer} is assigned to stream {assigned}, not {stream}")]
	StreamMismatch {
		peer: PeerId,
		assigned: StreamId,
		stream: StreamId,
	},

	#[error("invalid id")]
	InvalidId,
}

use std::sync::Arc;

use crate::ffi;

#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
	#[error("demux error: {0}")]
	Demux(#[from] rist_demux::Error),

	#[error("utf8 error: {0}")]
	Utf8(#[from] std::str::Utf8Error),

	#[error("invalid pointer")]
	InvalidPointer,

	#[error("invalid id")]
	InvalidId,

	#[error("not found")]
	NotFound,

	#[error("level error: {0}")]
	Level(Arc<tracing::metadata::ParseLevelError>),

	#[error("logging already initialized")]
	LogInit,

	#[error("invalid code")]
	InvalidCode,

	#[error("panic")]
	Panic,
}

impl From<tracing::metadata::ParseLevelError> for Error {
	fn from(err: tracing::metadata::ParseLevelError) -> Self {
		Error::Level(Arc::new(err))
	}
}

impl ffi::ReturnCode for Error {
	fn code(&self) -> i32 {
		match self {
			// Already logged by the receiver, and can happen once per packet.
			Error::Demux(err) => tracing::debug!("{}", err),
			err => tracing::error!("{}", err),
		}

		match self {
			Error::InvalidPointer => -1,
			Error::InvalidId => -2,
			Error::NotFound => -3,
			Error::Utf8(_) => -4,
			Error::Level(_) => -5,
			Error::Demux(rist_demux::Error::InvalidPayload) => -6,
			Error::Demux(rist_demux::Error::StreamMismatch { .. }) => -7,
			Error::Demux(rist_demux::Error::InvalidId) => -2,
			Error::LogInit => -8,
			Error::InvalidCode => -9,
			Error::Panic => -10,
		}
	}
}

use std::ffi::{c_char, c_void};

use bytes::Bytes;
use rist_demux::{DataBlock, PeerId, StreamId};

use crate::{rist_demux_block, rist_demux_callbacks, rist_demux_payload, Error, Id};

/// Runs the provided function, converting the return value to a C-compatible return code.
///
/// Panics are caught and reported as [Error::Panic] instead of unwinding into C.
pub fn enter<C: ReturnCode, F: FnOnce() -> C>(f: F) -> i32 {
	match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
		Ok(ret) => ret.code(),
		Err(_) => Error::Panic.code(),
	}
}

/// Wrapper for the C stream callbacks with user data.
///
/// Implements [rist_demux::Delegate] by forwarding each event to the matching function pointer, if set.
pub struct OnEvent {
	callbacks: rist_demux_callbacks,
}

impl OnEvent {
	/// Create a new callback wrapper.
	///
	/// # Safety
	/// - The caller must ensure user_data remains valid until the receiver is closed.
	/// - Each callback function pointer must be valid if provided.
	pub unsafe fn new(callbacks: rist_demux_callbacks) -> Self {
		Self { callbacks }
	}
}

// The C side promises user_data can be used from whichever thread the transport calls us on.
unsafe impl Send for OnEvent {}

impl rist_demux::Delegate for OnEvent {
	fn stream_connected(&mut self, id: StreamId) {
		if let Some(on_connected) = self.callbacks.on_connected {
			on_connected(self.callbacks.user_data, id);
		}
	}

	fn stream_disconnected(&mut self, id: StreamId) {
		if let Some(on_disconnected) = self.callbacks.on_disconnected {
			on_disconnected(self.callbacks.user_data, id);
		}
	}

	fn stream_data(&mut self, id: StreamId, batch: Vec<Bytes>) {
		let Some(on_data) = self.callbacks.on_data else {
			return;
		};

		// Borrowed views, only valid for the duration of the callback.
		let payloads: Vec<rist_demux_payload> = batch
			.iter()
			.map(|payload| rist_demux_payload {
				data: payload.as_ptr(),
				len: payload.len(),
			})
			.collect();

		on_data(self.callbacks.user_data, id, payloads.as_ptr(), payloads.len());
	}
}

/// A data block on loan from the transport.
///
/// The release callback runs exactly once, when this is dropped, no matter how far processing got.
pub struct Block {
	block: *mut rist_demux_block,
	release: Option<extern "C" fn(block: *mut rist_demux_block)>,
}

impl Block {
	/// Take ownership of the loan.
	///
	/// # Safety
	/// - block must be null or valid until release is called.
	/// - release must be valid if provided.
	pub unsafe fn new(block: *mut rist_demux_block, release: Option<extern "C" fn(block: *mut rist_demux_block)>) -> Self {
		Self { block, release }
	}

	fn get(&self) -> Option<&rist_demux_block> {
		unsafe { self.block.as_ref() }
	}

	/// The transport's peer pointer, used as the lookup key for a [PeerId].
	pub fn peer_key(&self) -> Result<usize, Error> {
		let block = self.get().ok_or(Error::InvalidPointer)?;
		parse_peer(block.peer)
	}

	/// Attach the resolved peer, producing something a [rist_demux::Receiver] accepts.
	pub fn with_peer(self, peer: PeerId) -> Result<PeerBlock, Error> {
		let stream = self.get().ok_or(Error::InvalidPointer)?.virt_dst_port;
		Ok(PeerBlock {
			block: self,
			peer,
			stream,
		})
	}
}

impl Drop for Block {
	fn drop(&mut self) {
		if let Some(release) = self.release {
			release(self.block);
		}
	}
}

/// A [Block] whose peer has been resolved.
pub struct PeerBlock {
	block: Block,
	peer: PeerId,
	stream: StreamId,
}

impl DataBlock for PeerBlock {
	fn peer(&self) -> PeerId {
		self.peer
	}

	fn stream_id(&self) -> StreamId {
		self.stream
	}

	fn payload(&self) -> Option<&[u8]> {
		// Unlike parse_slice, a null payload is never treated as empty.
		let block = self.block.get()?;
		match block.payload.is_null() {
			true => None,
			false => Some(unsafe { std::slice::from_raw_parts(block.payload, block.payload_len) }),
		}
	}
}

/// Types that can be converted to C-compatible return codes.
pub trait ReturnCode {
	/// Convert to an i32 status code.
	fn code(&self) -> i32;
}

impl ReturnCode for Result<(), Error> {
	fn code(&self) -> i32 {
		match self {
			Ok(()) => 0,
			Err(e) => e.code(),
		}
	}
}

impl ReturnCode for Result<Id, Error> {
	fn code(&self) -> i32 {
		match self {
			Ok(id) => i32::try_from(*id).unwrap_or_else(|_| Error::InvalidCode.code()),
			Err(e) => e.code(),
		}
	}
}

/// Parse a u32 handle into an Id.
pub fn parse_id(id: u32) -> Result<Id, Error> {
	Id::try_from(id)
}

/// Parse a C string pointer into a &str.
///
/// Returns an empty string if the pointer is null.
///
/// # Safety
/// The caller must ensure that cstr is valid for 'a.
pub unsafe fn parse_str<'a>(cstr: *const c_char, cstr_len: usize) -> Result<&'a str, Error> {
	let slice = unsafe { parse_slice(cstr as *const u8, cstr_len)? };
	let string = std::str::from_utf8(slice)?;
	Ok(string)
}

/// Parse a raw pointer and size into a byte slice.
///
/// Returns an empty slice if both pointer and size are zero.
///
/// # Safety
/// The caller must ensure that data is valid for 'a.
pub unsafe fn parse_slice<'a>(data: *const u8, size: usize) -> Result<&'a [u8], Error> {
	if data.is_null() {
		if size == 0 {
			return Ok(&[]);
		}

		return Err(Error::InvalidPointer);
	}

	let data = unsafe { std::slice::from_raw_parts(data, size) };
	Ok(data)
}

/// Cast an opaque peer pointer into a lookup key.
pub fn parse_peer(peer: *const c_void) -> Result<usize, Error> {
	match peer.is_null() {
		true => Err(Error::InvalidPointer),
		false => Ok(peer as usize),
	}
}

use std::ffi::{c_char, c_void};
use std::str::FromStr;
use std::time::Duration;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::ffi::{self, Block, OnEvent};
use crate::{Error, Id, State};

/// Stream callbacks registered with a receiver.
///
/// Every callback is optional and receives `user_data` as its first argument.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(non_camel_case_types)]
pub struct rist_demux_callbacks {
	pub user_data: *mut c_void,

	/// The first data block for a new stream arrived.
	pub on_connected: Option<extern "C" fn(user_data: *mut c_void, stream_id: u16)>,

	/// The last peer feeding a stream disconnected.
	pub on_disconnected: Option<extern "C" fn(user_data: *mut c_void, stream_id: u16)>,

	/// A batch of payloads, in arrival order.
	///
	/// The array and the bytes it points at are only valid until the callback returns.
	pub on_data: Option<
		extern "C" fn(user_data: *mut c_void, stream_id: u16, payloads: *const rist_demux_payload, payloads_len: usize),
	>,
}

/// A borrowed payload within a batch.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(non_camel_case_types)]
pub struct rist_demux_payload {
	pub data: *const u8,
	pub len: usize,
}

/// A data block received by the transport.
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct rist_demux_block {
	pub payload: *const u8,
	pub payload_len: usize,

	/// Identifies the logical stream.
	pub virt_dst_port: u16,

	/// The transport's peer, only used as an identity.
	pub peer: *const c_void,
}

/// Initialize logging to stderr at the given level ("error", "warn", "info", "debug", "trace").
///
/// An empty level defaults to "info". `RUST_LOG` directives take precedence.
/// Returns a negative code if the level is invalid or logging was already initialized.
///
/// # Safety
/// - The caller must ensure that level is a valid pointer to level_len bytes of data.
#[no_mangle]
pub unsafe extern "C" fn rist_demux_log_level(level: *const c_char, level_len: usize) -> i32 {
	ffi::enter(move || {
		let level = unsafe { ffi::parse_str(level, level_len)? };
		let level = match level {
			"" => LevelFilter::INFO,
			level => LevelFilter::from_level(tracing::Level::from_str(level)?),
		};

		let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
		tracing_subscriber::fmt()
			.with_writer(std::io::stderr)
			.with_env_filter(filter)
			.try_init()
			.map_err(|_| Error::LogInit)
	})
}

/// Create a receiver that demultiplexes data blocks into streams.
///
/// `flush_interval_ms` is the minimum time between two batches of the same stream; 0 uses the default (50ms).
///
/// Returns a non-zero handle to the receiver on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that callbacks is a valid pointer.
/// - user_data and the callbacks must remain valid until [rist_demux_receiver_close] is called.
#[no_mangle]
pub unsafe extern "C" fn rist_demux_receiver_create(
	flush_interval_ms: u32,
	callbacks: *const rist_demux_callbacks,
) -> i32 {
	ffi::enter(move || -> Result<Id, Error> {
		let callbacks = unsafe { callbacks.as_ref() }.ok_or(Error::InvalidPointer)?;
		let on_event = unsafe { OnEvent::new(*callbacks) };

		let flush_interval = match flush_interval_ms {
			0 => None,
			ms => Some(Duration::from_millis(ms.into())),
		};

		Ok(State::lock().receiver_create(flush_interval, on_event))
	})
}

/// Close a receiver, dropping anything still buffered.
///
/// No callbacks fire once this returns, unless a notification is already in flight on another thread.
///
/// Returns a zero on success, or a negative code on failure.
#[no_mangle]
pub extern "C" fn rist_demux_receiver_close(receiver: u32) -> i32 {
	ffi::enter(move || {
		let receiver = ffi::parse_id(receiver)?;
		State::lock().receiver_close(receiver)
	})
}

/// Deliver every stream's buffered payloads now, ignoring the flush interval.
///
/// Returns a zero on success, or a negative code on failure.
#[no_mangle]
pub extern "C" fn rist_demux_receiver_flush(receiver: u32) -> i32 {
	ffi::enter(move || {
		let receiver = ffi::parse_id(receiver)?;
		State::flush(receiver)
	})
}

/// Notify the receiver that a peer connected or disconnected.
///
/// Disconnecting the last peer of a stream fires `on_disconnected`.
/// Repeated or unknown disconnects are ignored.
///
/// Returns a zero on success, or a negative code on failure.
#[no_mangle]
pub extern "C" fn rist_demux_connection_status(receiver: u32, peer: *const c_void, connected: bool) -> i32 {
	ffi::enter(move || {
		let receiver = ffi::parse_id(receiver)?;
		let peer = ffi::parse_peer(peer)?;
		State::connection_status(receiver, peer, connected)
	})
}

/// Hand a data block to the receiver.
///
/// The payload is copied, then `release(block)` is called exactly once before this returns,
/// on success and on every failure path. Callbacks may fire before this returns.
///
/// Returns a zero on success, or a negative code if the block was discarded.
///
/// # Safety
/// - The caller must ensure that block is null or valid until release is called.
/// - The payload must be null or point at payload_len bytes.
#[no_mangle]
pub unsafe extern "C" fn rist_demux_data_block(
	receiver: u32,
	block: *mut rist_demux_block,
	release: Option<extern "C" fn(block: *mut rist_demux_block)>,
) -> i32 {
	// Take the loan first so it's released even if the handle is bad.
	let block = unsafe { Block::new(block, release) };

	ffi::enter(move || {
		let receiver = ffi::parse_id(receiver)?;
		State::data_block(receiver, block)
	})
}

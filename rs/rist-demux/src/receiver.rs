use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

use crate::{Clock, Config, Delegate, Error, PeerId, Registry, StreamId, SystemClock};

/// A block of data on loan from the transport.
///
/// Implementations hand the underlying resource back to the transport when dropped.
/// [Receiver::data_block_arrived] takes blocks by value, so every block is released exactly once,
/// whether it was accepted or discarded.
pub trait DataBlock {
	/// The peer that delivered the block.
	fn peer(&self) -> PeerId;

	/// The virtual destination port of the block.
	fn stream_id(&self) -> StreamId;

	/// The payload, or None if the transport handed us a block without one.
	fn payload(&self) -> Option<&[u8]>;
}

/// The transport-facing side of a [Registry].
///
/// Notifications may arrive from any thread. Each one holds a lock for its whole duration,
/// so membership changes, buffering and flushing for different peers never interleave.
///
/// The [Delegate] runs with that lock held and must not call back into the same receiver.
pub struct Receiver<D, C = SystemClock> {
	registry: Mutex<Registry<D, C>>,
}

impl<D: Delegate> Receiver<D, SystemClock> {
	pub fn new(config: Config, delegate: D) -> Self {
		Self::with_clock(config, delegate, SystemClock)
	}
}

impl<D: Delegate, C: Clock> Receiver<D, C> {
	pub fn with_clock(config: Config, delegate: D, clock: C) -> Self {
		Self {
			registry: Mutex::new(Registry::with_clock(config, delegate, clock)),
		}
	}

	/// A peer connected or disconnected.
	///
	/// Duplicate notifications are harmless.
	pub fn connection_status_changed(&self, peer: PeerId, connected: bool) {
		self.registry.lock().on_connection_status(peer, connected);
	}

	/// A block of data arrived.
	///
	/// The payload is copied and the block released before any [Delegate] method runs.
	/// A block without a payload is discarded with [Error::InvalidPayload]; no state changes and no events fire.
	pub fn data_block_arrived<B: DataBlock>(&self, block: B) -> Result<(), Error> {
		let peer = block.peer();
		let stream = block.stream_id();

		let Some(payload) = block.payload().map(Bytes::copy_from_slice) else {
			tracing::warn!(%peer, stream, "data block without payload, discarding");
			return Err(Error::InvalidPayload);
		};

		// Give the block back to the transport as soon as we have our own copy.
		drop(block);

		self.registry.lock().on_data(stream, peer, payload)
	}

	/// Lock the registry for direct inspection or flushing.
	pub fn lock(&self) -> MutexGuard<'_, Registry<D, C>> {
		self.registry.lock()
	}

	pub fn into_registry(self) -> Registry<D, C> {
		self.registry.into_inner()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	use super::*;
	use crate::{Event, ManualClock};

	struct Block {
		peer: PeerId,
		stream: StreamId,
		payload: Option<Vec<u8>>,
		released: Arc<AtomicUsize>,
	}

	impl DataBlock for Block {
		fn peer(&self) -> PeerId {
			self.peer
		}

		fn stream_id(&self) -> StreamId {
			self.stream
		}

		fn payload(&self) -> Option<&[u8]> {
			self.payload.as_deref()
		}
	}

	impl Drop for Block {
		fn drop(&mut self) {
			self.released.fetch_add(1, Ordering::SeqCst);
		}
	}

	fn block(peer: u32, stream: StreamId, payload: &[u8], released: &Arc<AtomicUsize>) -> Block {
		Block {
			peer: PeerId::try_from(peer).unwrap(),
			stream,
			payload: Some(payload.to_vec()),
			released: released.clone(),
		}
	}

	fn empty_block(peer: u32, stream: StreamId, released: &Arc<AtomicUsize>) -> Block {
		Block {
			peer: PeerId::try_from(peer).unwrap(),
			stream,
			payload: None,
			released: released.clone(),
		}
	}

	fn receiver() -> (Receiver<Vec<Event>, ManualClock>, ManualClock) {
		let clock = ManualClock::new();
		let receiver = Receiver::with_clock(Config::default(), Vec::new(), clock.clone());
		(receiver, clock)
	}

	#[test]
	fn test_release_accepted() {
		let (receiver, _clock) = receiver();
		let released = Arc::new(AtomicUsize::new(0));

		receiver.data_block_arrived(block(1, 10, b"abc", &released)).unwrap();
		receiver.data_block_arrived(block(1, 10, b"", &released)).unwrap();

		assert_eq!(released.load(Ordering::SeqCst), 2);
		assert_eq!(receiver.lock().get(10).unwrap().buffered(), 2);
	}

	#[test]
	fn test_release_discarded() {
		let (receiver, _clock) = receiver();
		let released = Arc::new(AtomicUsize::new(0));

		let err = receiver.data_block_arrived(empty_block(1, 10, &released)).unwrap_err();
		assert_eq!(err, Error::InvalidPayload);
		assert_eq!(released.load(Ordering::SeqCst), 1);

		// Nothing was created and nothing fired.
		let registry = receiver.lock();
		assert!(registry.is_empty());
		assert_eq!(registry.stream_of(PeerId::try_from(1).unwrap()), None);
		assert!(registry.delegate().is_empty());
	}

	#[test]
	fn test_release_mismatch() {
		let (receiver, _clock) = receiver();
		let released = Arc::new(AtomicUsize::new(0));

		receiver.data_block_arrived(block(1, 10, b"a", &released)).unwrap();
		let res = receiver.data_block_arrived(block(1, 11, b"b", &released));
		assert!(matches!(res, Err(Error::StreamMismatch { .. })));
		assert_eq!(released.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn test_connection_status() {
		let (receiver, clock) = receiver();
		let released = Arc::new(AtomicUsize::new(0));
		let (a, b) = (PeerId::try_from(1).unwrap(), PeerId::try_from(2).unwrap());

		receiver.connection_status_changed(a, true);
		receiver.connection_status_changed(b, true);
		receiver.data_block_arrived(block(1, 5000, b"1", &released)).unwrap();
		receiver.data_block_arrived(block(2, 5000, b"2", &released)).unwrap();

		clock.advance(Duration::from_millis(51));
		receiver.data_block_arrived(block(1, 5000, b"3", &released)).unwrap();

		receiver.connection_status_changed(a, false);
		receiver.connection_status_changed(a, false);
		receiver.connection_status_changed(b, false);

		let events = receiver.into_registry().into_delegate();
		assert_eq!(
			events,
			vec![
				Event::Connected(5000),
				Event::Data(
					5000,
					vec![Bytes::from_static(b"1"), Bytes::from_static(b"2"), Bytes::from_static(b"3")]
				),
				Event::Disconnected(5000),
			]
		);
	}

	#[test]
	fn test_concurrent_peers() {
		let receiver = Arc::new(Receiver::new(Config::default(), Vec::new()));
		let released = Arc::new(AtomicUsize::new(0));

		let threads: Vec<_> = (1..=4u32)
			.map(|peer| {
				let receiver = receiver.clone();
				let released = released.clone();
				std::thread::spawn(move || {
					for n in 0..100u8 {
						receiver
							.data_block_arrived(block(peer, 1, &[n], &released))
							.unwrap();
					}
					receiver.connection_status_changed(PeerId::try_from(peer).unwrap(), false);
				})
			})
			.collect();

		for thread in threads {
			thread.join().unwrap();
		}

		assert_eq!(released.load(Ordering::SeqCst), 400);

		let receiver = Arc::into_inner(receiver).unwrap();
		let events = receiver.into_registry().into_delegate();

		let connects = events.iter().filter(|event| matches!(event, Event::Connected(1))).count();
		let payloads: usize = events
			.iter()
			.map(|event| match event {
				Event::Data(_, batch) => batch.len(),
				_ => 0,
			})
			.sum();

		// A peer can disconnect while another is still to send its first packet,
		// so the stream may be torn down and recreated, but nothing is lost.
		assert!(connects >= 1);
		assert_eq!(payloads, 400);
		assert_eq!(events.last(), Some(&Event::Disconnected(1)));
	}
}

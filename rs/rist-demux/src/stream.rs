use std::collections::HashSet;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::{PeerId, StreamId};

/// A logical stream: every payload tagged with the same [StreamId], regardless of which peer delivered it.
///
/// Owned by a [crate::Registry], which removes it as soon as its last peer leaves.
#[derive(Debug)]
pub struct Stream {
	id: StreamId,

	// The peers currently delivering packets for this stream.
	peers: HashSet<PeerId>,

	// Payloads received since the last batch, in arrival order.
	buffer: Vec<Bytes>,

	// When the last batch was delivered, or when the stream was created.
	last_flush: Instant,
}

impl Stream {
	pub(crate) fn new(id: StreamId, now: Instant) -> Self {
		Self {
			id,
			peers: HashSet::new(),
			buffer: Vec::new(),
			last_flush: now,
		}
	}

	pub fn id(&self) -> StreamId {
		self.id
	}

	pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
		self.peers.iter().copied()
	}

	pub fn has_peer(&self, peer: PeerId) -> bool {
		self.peers.contains(&peer)
	}

	/// The number of payloads waiting for the next batch.
	pub fn buffered(&self) -> usize {
		self.buffer.len()
	}

	pub fn last_flush(&self) -> Instant {
		self.last_flush
	}

	/// Returns true if the peer was not already a member.
	pub(crate) fn join(&mut self, peer: PeerId) -> bool {
		self.peers.insert(peer)
	}

	/// Returns true if the peer was a member.
	pub(crate) fn leave(&mut self, peer: PeerId) -> bool {
		self.peers.remove(&peer)
	}

	pub(crate) fn is_orphaned(&self) -> bool {
		self.peers.is_empty()
	}

	/// Buffer a payload, returning a batch if more than `interval` has passed since the last one.
	pub(crate) fn push(&mut self, payload: Bytes, now: Instant, interval: Duration) -> Option<Vec<Bytes>> {
		self.buffer.push(payload);

		if now.saturating_duration_since(self.last_flush) > interval {
			self.take(now)
		} else {
			None
		}
	}

	/// Drain the buffer as a batch, resetting the flush timer.
	///
	/// Returns None and leaves the timer alone when there's nothing buffered.
	pub(crate) fn take(&mut self, now: Instant) -> Option<Vec<Bytes>> {
		if self.buffer.is_empty() {
			return None;
		}

		self.last_flush = now;
		Some(std::mem::take(&mut self.buffer))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const INTERVAL: Duration = Duration::from_millis(50);

	fn ms(start: Instant, millis: u64) -> Instant {
		start + Duration::from_millis(millis)
	}

	#[test]
	fn test_buffer_within_window() {
		let start = Instant::now();
		let mut stream = Stream::new(1, start);

		assert_eq!(stream.push(Bytes::from_static(b"a"), ms(start, 0), INTERVAL), None);
		assert_eq!(stream.push(Bytes::from_static(b"b"), ms(start, 10), INTERVAL), None);
		assert_eq!(stream.buffered(), 2);
		assert_eq!(stream.last_flush(), start);
	}

	#[test]
	fn test_flush_after_window() {
		let start = Instant::now();
		let mut stream = Stream::new(1, start);

		stream.push(Bytes::from_static(b"a"), ms(start, 5), INTERVAL);
		let batch = stream.push(Bytes::from_static(b"b"), ms(start, 55), INTERVAL);

		assert_eq!(batch, Some(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]));
		assert_eq!(stream.buffered(), 0);
		assert_eq!(stream.last_flush(), ms(start, 55));
	}

	#[test]
	fn test_exact_window_does_not_flush() {
		let start = Instant::now();
		let mut stream = Stream::new(1, start);

		// The elapsed time must be strictly greater than the interval.
		assert_eq!(stream.push(Bytes::from_static(b"a"), ms(start, 50), INTERVAL), None);
		assert!(stream.push(Bytes::from_static(b"b"), ms(start, 51), INTERVAL).is_some());
	}

	#[test]
	fn test_window_restarts_after_flush() {
		let start = Instant::now();
		let mut stream = Stream::new(1, start);

		assert!(stream.push(Bytes::from_static(b"a"), ms(start, 60), INTERVAL).is_some());
		assert_eq!(stream.push(Bytes::from_static(b"b"), ms(start, 100), INTERVAL), None);
		assert_eq!(
			stream.push(Bytes::from_static(b"c"), ms(start, 111), INTERVAL),
			Some(vec![Bytes::from_static(b"b"), Bytes::from_static(b"c")])
		);
	}

	#[test]
	fn test_take_empty() {
		let start = Instant::now();
		let mut stream = Stream::new(1, start);

		assert_eq!(stream.take(ms(start, 100)), None);
		assert_eq!(stream.last_flush(), start);
	}

	#[test]
	fn test_membership() {
		let mut stream = Stream::new(1, Instant::now());
		let peer = PeerId::try_from(1).unwrap();

		assert!(stream.join(peer));
		assert!(!stream.join(peer));
		assert!(stream.has_peer(peer));
		assert!(!stream.is_orphaned());

		assert!(stream.leave(peer));
		assert!(!stream.leave(peer));
		assert!(stream.is_orphaned());
	}
}

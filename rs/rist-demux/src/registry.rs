use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use bytes::Bytes;

use crate::{Clock, Config, Delegate, Error, PeerId, Stream, StreamId, SystemClock};

/// Classifies payloads into [Stream]s and derives stream-level events from peer lifecycle.
///
/// Each peer is either unassigned or a member of exactly one stream.
/// A peer joins a stream when its first payload arrives, and leaves when it disconnects.
/// Connection status alone never creates membership.
///
/// Not thread-safe on its own; see [crate::Receiver] for the serialized version.
pub struct Registry<D, C = SystemClock> {
	config: Config,
	clock: C,
	delegate: D,

	// Every active stream by ID. Each one has at least one peer.
	streams: HashMap<StreamId, Stream>,

	// Which stream each member peer feeds, used to resolve disconnects.
	members: HashMap<PeerId, StreamId>,

	// Peers the transport reported as connected, member or not.
	connected: HashSet<PeerId>,
}

impl<D: Delegate> Registry<D, SystemClock> {
	pub fn new(config: Config, delegate: D) -> Self {
		Self::with_clock(config, delegate, SystemClock)
	}
}

impl<D: Delegate, C: Clock> Registry<D, C> {
	pub fn with_clock(config: Config, delegate: D, clock: C) -> Self {
		Self {
			config,
			clock,
			delegate,
			streams: HashMap::new(),
			members: HashMap::new(),
			connected: HashSet::new(),
		}
	}

	/// Accept a payload from `peer` tagged with `id`.
	///
	/// Creates the stream on first sight, firing [Delegate::stream_connected] before anything else.
	/// Fires [Delegate::stream_data] if the flush interval has elapsed.
	///
	/// A peer that already feeds a different stream is rejected with [Error::StreamMismatch] and nothing changes.
	pub fn on_data(&mut self, id: StreamId, peer: PeerId, payload: Bytes) -> Result<(), Error> {
		if let Some(&assigned) = self.members.get(&peer) {
			if assigned != id {
				tracing::warn!(%peer, assigned, stream = id, "peer changed streams, discarding");
				return Err(Error::StreamMismatch {
					peer,
					assigned,
					stream: id,
				});
			}
		}

		let now = self.clock.now();

		let stream = match self.streams.entry(id) {
			Entry::Occupied(entry) => entry.into_mut(),
			Entry::Vacant(entry) => {
				tracing::info!(stream = id, %peer, "stream connected");
				self.delegate.stream_connected(id);
				entry.insert(Stream::new(id, now))
			}
		};

		if stream.join(peer) {
			tracing::debug!(stream = id, %peer, "peer joined");
			self.members.insert(peer, id);
		}

		tracing::trace!(stream = id, %peer, size = payload.len(), "payload");

		if let Some(batch) = stream.push(payload, now, self.config.flush_interval) {
			tracing::trace!(stream = id, count = batch.len(), "flush");
			self.delegate.stream_data(id, batch);
		}

		Ok(())
	}

	/// Bookkeeping only: membership is decided by data, not connection status.
	pub fn on_peer_connected(&mut self, peer: PeerId) {
		if self.connected.insert(peer) {
			tracing::debug!(%peer, "peer connected");
		}
	}

	/// Remove `peer` from its stream, tearing the stream down if it was the last member.
	///
	/// Anything still buffered is delivered as a final batch before [Delegate::stream_disconnected].
	/// Unknown or already disconnected peers are ignored.
	pub fn on_peer_disconnected(&mut self, peer: PeerId) {
		self.connected.remove(&peer);

		let Some(id) = self.members.remove(&peer) else {
			tracing::trace!(%peer, "untracked peer disconnected");
			return;
		};

		let Entry::Occupied(mut entry) = self.streams.entry(id) else {
			return;
		};

		entry.get_mut().leave(peer);
		tracing::debug!(stream = id, %peer, "peer left");

		if !entry.get().is_orphaned() {
			return;
		}

		let mut stream = entry.remove();
		if let Some(batch) = stream.take(self.clock.now()) {
			self.delegate.stream_data(id, batch);
		}

		tracing::info!(stream = id, "stream disconnected");
		self.delegate.stream_disconnected(id);
	}

	/// Dispatch a raw connection status notification from the transport.
	pub fn on_connection_status(&mut self, peer: PeerId, connected: bool) {
		match connected {
			true => self.on_peer_connected(peer),
			false => self.on_peer_disconnected(peer),
		}
	}

	/// Deliver whatever the stream has buffered, ignoring the flush interval.
	///
	/// Returns true if a batch was delivered.
	pub fn flush(&mut self, id: StreamId) -> bool {
		let now = self.clock.now();
		let Some(batch) = self.streams.get_mut(&id).and_then(|stream| stream.take(now)) else {
			return false;
		};

		self.delegate.stream_data(id, batch);
		true
	}

	/// [Self::flush] every stream, in ascending ID order.
	pub fn flush_all(&mut self) {
		for id in self.stream_ids() {
			self.flush(id);
		}
	}

	pub fn get(&self, id: StreamId) -> Option<&Stream> {
		self.streams.get(&id)
	}

	pub fn contains(&self, id: StreamId) -> bool {
		self.streams.contains_key(&id)
	}

	/// Every active stream, in ascending order.
	pub fn stream_ids(&self) -> Vec<StreamId> {
		let mut ids: Vec<_> = self.streams.keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	/// The stream this peer feeds, if it has delivered any data.
	pub fn stream_of(&self, peer: PeerId) -> Option<StreamId> {
		self.members.get(&peer).copied()
	}

	pub fn is_connected(&self, peer: PeerId) -> bool {
		self.connected.contains(&peer)
	}

	pub fn len(&self) -> usize {
		self.streams.len()
	}

	pub fn is_empty(&self) -> bool {
		self.streams.is_empty()
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn delegate(&self) -> &D {
		&self.delegate
	}

	pub fn delegate_mut(&mut self) -> &mut D {
		&mut self.delegate
	}

	pub fn into_delegate(self) -> D {
		self.delegate
	}
}

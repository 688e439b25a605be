use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZero;

use crate::Error;

/// An opaque handle for a transport-level peer.
///
/// Issued by a [PeerTable]. It never owns or points at the transport's peer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(NonZero<u32>);

impl std::fmt::Display for PeerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0.get())
	}
}

// Zero is reserved so it can mean "no peer" across the C ABI.
pub(crate) struct NonZeroSlab<T>(slab::Slab<T>);

impl<T> NonZeroSlab<T> {
	pub fn insert(&mut self, value: T) -> PeerId {
		let id = self.0.insert(value) + 1;
		let id = u32::try_from(id).ok().and_then(NonZero::new).expect("u32 overflow");
		PeerId(id)
	}

	pub fn get(&self, id: PeerId) -> Option<&T> {
		self.0.get(Self::index(id))
	}

	pub fn remove(&mut self, id: PeerId) -> Option<T> {
		self.0.try_remove(Self::index(id))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	fn index(id: PeerId) -> usize {
		(id.0.get() - 1) as usize
	}
}

impl<T> Default for NonZeroSlab<T> {
	fn default() -> Self {
		Self(slab::Slab::new())
	}
}

impl TryFrom<u32> for PeerId {
	type Error = Error;

	fn try_from(value: u32) -> Result<Self, Self::Error> {
		NonZero::try_from(value).map(PeerId).map_err(|_| Error::InvalidId)
	}
}

impl From<PeerId> for u32 {
	fn from(value: PeerId) -> Self {
		value.0.get()
	}
}

/// Maps whatever the transport uses to identify a peer (ex. a pointer address) to a [PeerId].
///
/// Slots are reused once released, so a [PeerId] is only meaningful while its key is live.
pub struct PeerTable<K> {
	slots: NonZeroSlab<K>,
	lookup: HashMap<K, PeerId>,
}

impl<K: Clone + Eq + Hash> PeerTable<K> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Return the id for this key, issuing a new one if the key is unknown.
	pub fn resolve(&mut self, key: K) -> PeerId {
		if let Some(id) = self.lookup.get(&key) {
			return *id;
		}

		let id = self.slots.insert(key.clone());
		self.lookup.insert(key, id);
		id
	}

	/// Return the id for this key without issuing one.
	pub fn get(&self, key: &K) -> Option<PeerId> {
		self.lookup.get(key).copied()
	}

	/// Return the key that was issued this id.
	pub fn key(&self, id: PeerId) -> Option<&K> {
		self.slots.get(id)
	}

	/// Forget the key, freeing its slot for reuse.
	pub fn release(&mut self, key: &K) -> Option<PeerId> {
		let id = self.lookup.remove(key)?;
		self.slots.remove(id);
		Some(id)
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<K> Default for PeerTable<K> {
	fn default() -> Self {
		Self {
			slots: NonZeroSlab::default(),
			lookup: HashMap::new(),
		}
	}
}

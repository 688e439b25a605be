use std::ops::{Deref, DerefMut};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use rist_demux::{Config, PeerTable, Receiver};

use crate::ffi::{Block, OnEvent};
use crate::{Error, Id, NonZeroSlab};

struct Session {
	// Maps the transport's peer pointers to peer IDs.
	// Always locked before the receiver, so a released ID can't be reissued mid-disconnect.
	peers: Mutex<PeerTable<usize>>,

	receiver: Receiver<OnEvent>,
}

pub struct State {
	// All receivers by ID.
	receivers: NonZeroSlab<Arc<Session>>,
}

pub struct StateGuard {
	state: MutexGuard<'static, State>,
}

impl Deref for StateGuard {
	type Target = State;
	fn deref(&self) -> &Self::Target {
		&self.state
	}
}

impl DerefMut for StateGuard {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.state
	}
}

static STATE: LazyLock<Mutex<State>> = LazyLock::new(|| Mutex::new(State::new()));

impl State {
	pub fn lock() -> StateGuard {
		StateGuard { state: STATE.lock() }
	}

	fn new() -> Self {
		Self {
			receivers: Default::default(),
		}
	}

	pub fn receiver_create(&mut self, flush_interval: Option<Duration>, on_event: OnEvent) -> Id {
		let config = flush_interval.map(Config::with_flush_interval).unwrap_or_default();
		tracing::debug!(flush_interval = ?config.flush_interval, "receiver created");

		self.receivers.insert(Arc::new(Session {
			peers: Mutex::new(PeerTable::new()),
			receiver: Receiver::new(config, on_event),
		}))
	}

	pub fn receiver_close(&mut self, id: Id) -> Result<(), Error> {
		self.receivers.remove(id).ok_or(Error::NotFound)?;
		Ok(())
	}

	fn session(&self, id: Id) -> Result<Arc<Session>, Error> {
		self.receivers.get(id).cloned().ok_or(Error::NotFound)
	}

	// NOTE: The methods below take the state lock only long enough to find the receiver.
	// Callbacks run without it, so they may create or close other receivers.

	pub fn connection_status(id: Id, key: usize, connected: bool) -> Result<(), Error> {
		let session = State::lock().session(id)?;
		let mut peers = session.peers.lock();

		if connected {
			let peer = peers.resolve(key);
			session.receiver.connection_status_changed(peer, true);
		} else if let Some(peer) = peers.get(&key) {
			session.receiver.connection_status_changed(peer, false);
			peers.release(&key);
		}

		Ok(())
	}

	pub fn data_block(id: Id, block: Block) -> Result<(), Error> {
		let session = State::lock().session(id)?;
		let mut peers = session.peers.lock();

		let peer = peers.resolve(block.peer_key()?);
		session.receiver.data_block_arrived(block.with_peer(peer)?)?;

		Ok(())
	}

	pub fn flush(id: Id) -> Result<(), Error> {
		let session = State::lock().session(id)?;
		let _peers = session.peers.lock();

		session.receiver.lock().flush_all();
		Ok(())
	}
}

//! # rist-demux: RIST receiver stream demultiplexing
//!
//! A RIST receiver can be reached by several transport-level peers at once (ex. bonded or redundant network paths).
//! Every packet carries a virtual destination port, and packets with the same port belong to the same logical stream
//! no matter which peer delivered them.
//!
//! This crate sits between the transport callbacks and the application:
//! - Packets are classified into a [Stream] by their [StreamId].
//! - Peers are tracked per stream, so a stream is only torn down when the *last* peer feeding it disconnects.
//! - Payloads are coalesced into batches, at most one per [Config::flush_interval] per stream.
//!
//! ## API
//!
//! - [Registry]: The single-threaded core. Owns every [Stream] and drives a [Delegate].
//! - [Receiver]: A [Registry] behind a mutex, exposing the two transport notifications.
//! - [DataBlock]: A block of data borrowed from the transport, released when dropped.
//! - [PeerTable]: Issues [PeerId]s for whatever the transport uses to identify peers.
//! - [Clock]: The time source, swapped for a [ManualClock] in tests.
//!
//! The [Delegate] is called synchronously from within each notification.
//! Use the [Event] channel adapter if the consumer lives on another thread.
//!
//! The transport itself (retransmission, encryption, reordering) is out of scope.

mod clock;
mod config;
mod delegate;
mod error;
mod id;
mod receiver;
mod registry;
mod stream;

pub use clock::*;
pub use config::*;
pub use delegate::*;
pub use error::*;
pub use id::*;
pub use receiver::*;
pub use registry::*;
pub use stream::*;

/// The virtual destination port carried by each packet, identifying its logical stream.
pub type StreamId = u16;

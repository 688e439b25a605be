//! C FFI bindings for [`rist_demux`].
//!
//! Lets a C transport (ex. librist) drive a demultiplexing receiver directly from its callbacks.
//!
//! ## Concepts
//!
//! - **Receiver**: Demultiplexes data blocks into logical streams and batches them.
//! - **Peer**: The transport's opaque peer pointer, only ever used as a lookup key.
//! - **Stream**: All blocks with the same virtual destination port.
//!
//! ## Error Handling
//!
//! All functions return negative error codes on failure or non-negative values on success.
//! Receivers are managed through opaque integer handles that must be explicitly closed.
//!
//! ## Threading
//!
//! Callbacks run synchronously on whichever thread called into the library.
//! They must not call back into the same receiver.

mod api;
mod error;
mod ffi;
mod id;
mod state;

pub use api::*;
pub use error::*;
pub use id::*;

pub(crate) use state::*;

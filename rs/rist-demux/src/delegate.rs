use bytes::Bytes;
use tokio::sync::mpsc;

use crate::StreamId;

/// Receives stream-level events from a [crate::Registry].
///
/// Every method is called synchronously on the transport's dispatch thread, while the registry is busy.
/// Hand off to another thread (ex. via [Event] and a channel) if the work is expensive.
pub trait Delegate: Send {
	/// The first packet for a new stream arrived.
	fn stream_connected(&mut self, id: StreamId);

	/// The last peer feeding the stream disconnected.
	fn stream_disconnected(&mut self, id: StreamId);

	/// A batch of payloads, in arrival order.
	fn stream_data(&mut self, id: StreamId, batch: Vec<Bytes>);
}

impl<D: Delegate + ?Sized> Delegate for Box<D> {
	fn stream_connected(&mut self, id: StreamId) {
		(**self).stream_connected(id)
	}

	fn stream_disconnected(&mut self, id: StreamId) {
		(**self).stream_disconnected(id)
	}

	fn stream_data(&mut self, id: StreamId, batch: Vec<Bytes>) {
		(**self).stream_data(id, batch)
	}
}

/// A [Delegate] callback as a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
	Connected(StreamId),
	Disconnected(StreamId),
	Data(StreamId, Vec<Bytes>),
}

impl Event {
	pub fn stream(&self) -> StreamId {
		match self {
			Self::Connected(id) | Self::Disconnected(id) | Self::Data(id, _) => *id,
		}
	}
}

/// Records every event in order.
impl Delegate for Vec<Event> {
	fn stream_connected(&mut self, id: StreamId) {
		self.push(Event::Connected(id));
	}

	fn stream_disconnected(&mut self, id: StreamId) {
		self.push(Event::Disconnected(id));
	}

	fn stream_data(&mut self, id: StreamId, batch: Vec<Bytes>) {
		self.push(Event::Data(id, batch));
	}
}

/// Forwards events to another task.
///
/// The channel is unbounded so the transport thread never waits on the consumer.
/// Events are dropped once the receiving half is closed.
impl Delegate for mpsc::UnboundedSender<Event> {
	fn stream_connected(&mut self, id: StreamId) {
		self.send(Event::Connected(id)).ok();
	}

	fn stream_disconnected(&mut self, id: StreamId) {
		self.send(Event::Disconnected(id)).ok();
	}

	fn stream_data(&mut self, id: StreamId, batch: Vec<Bytes>) {
		if self.send(Event::Data(id, batch)).is_err() {
			tracing::debug!(stream = id, "event receiver closed, dropping batch");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_record() {
		let mut events = Vec::new();
		events.stream_connected(1);
		events.stream_data(1, vec![Bytes::from_static(b"a")]);
		events.stream_disconnected(1);

		assert_eq!(
			events,
			vec![
				Event::Connected(1),
				Event::Data(1, vec![Bytes::from_static(b"a")]),
				Event::Disconnected(1),
			]
		);
		assert!(events.iter().all(|event| event.stream() == 1));
	}

	#[tokio::test]
	async fn test_channel() {
		let (mut tx, mut rx) = mpsc::unbounded_channel();

		tokio::spawn(async move {
			tx.stream_connected(5000);
			tx.stream_data(5000, vec![Bytes::from_static(b"payload")]);
			tx.stream_disconnected(5000);
		});

		assert_eq!(rx.recv().await, Some(Event::Connected(5000)));
		assert_eq!(
			rx.recv().await,
			Some(Event::Data(5000, vec![Bytes::from_static(b"payload")]))
		);
		assert_eq!(rx.recv().await, Some(Event::Disconnected(5000)));
		assert_eq!(rx.recv().await, None);
	}

	#[test]
	fn test_channel_closed() {
		let (mut tx, rx) = mpsc::unbounded_channel();
		drop(rx);

		// Nothing to deliver to, but nothing to fail either.
		tx.stream_connected(1);
		tx.stream_data(1, Vec::new());
	}

	#[test]
	fn test_boxed() {
		let mut boxed: Box<Vec<Event>> = Box::default();
		boxed.stream_connected(3);
		assert_eq!(*boxed, vec![Event::Connected(3)]);
	}
}

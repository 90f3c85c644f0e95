use std::collections::VecDeque;

/// Bounded FIFO of emissions waiting for rate limit tokens.
///
/// Pushing into a full backlog evicts and returns the oldest entry.
#[derive(Debug)]
pub struct Backlog<T> {
	items: VecDeque<T>,
	capacity: usize,
}

impl<T> Backlog<T> {
	pub fn new(capacity: usize) -> Self {
		Self {
			items: VecDeque::with_capacity(capacity.min(1024)),
			capacity: capacity.max(1),
		}
	}

	/// Queues `item`, returning the evicted oldest entry if the backlog was full.
	pub fn push(&mut self, item: T) -> Option<T> {
		let evicted = if self.items.len() >= self.capacity {
			self.items.pop_front()
		} else {
			None
		};
		self.items.push_back(item);
		evicted
	}

	pub fn pop(&mut self) -> Option<T> {
		self.items.pop_front()
	}

	/// Puts an entry back at the head, e.g. when it still could not be admitted.
	pub fn requeue(&mut self, item: T) {
		self.items.push_front(item);
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

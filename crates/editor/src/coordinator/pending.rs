use std::collections::VecDeque;

use thiserror::Error;

/// A file waiting for the evaluator's file tree to become reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
	pub name: String,
	pub bytes: Vec<u8>,
}

/// The pending-file queue is at capacity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pending file queue is full ({capacity} files); dropped {name}")]
pub struct PendingFilesFull {
	pub capacity: usize,
	pub name: String,
}

/// Bounded FIFO of files waiting to be written.
///
/// Holds everything forwarded before readiness until the one-time drain,
/// then whatever arrives while a flush is still writing.
#[derive(Debug)]
pub struct PendingFiles {
	queue: VecDeque<PendingFile>,
	capacity: usize,
	drained: bool,
}

impl PendingFiles {
	pub fn new(capacity: usize) -> Self {
		Self {
			queue: VecDeque::new(),
			capacity,
			drained: false,
		}
	}

	pub fn push(&mut self, file: PendingFile) -> Result<(), PendingFilesFull> {
		if self.queue.len() >= self.capacity {
			return Err(PendingFilesFull {
				capacity: self.capacity,
				name: file.name,
			});
		}
		self.queue.push_back(file);
		Ok(())
	}

	/// Takes every queued file in arrival order. Returns `None` after the first drain.
	pub fn drain_once(&mut self) -> Option<Vec<PendingFile>> {
		if self.drained {
			return None;
		}
		self.drained = true;
		Some(self.queue.drain(..).collect())
	}

	/// Takes the files queued since the last drain.
	pub fn take(&mut self) -> Vec<PendingFile> {
		self.queue.drain(..).collect()
	}

	/// Whether the one-time drain has happened.
	pub fn is_drained(&self) -> bool {
		self.drained
	}

	pub fn len(&self) -> usize {
		self.queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.queue.is_empty()
	}
}

//! Off-task document persistence.
//!
//! At most one blocking save runs at a time. Texts submitted while it runs
//! overwrite each other, so only the newest is written next.

use std::sync::Arc;

use mdm_worker::TaskClass;
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::storage::DocumentStore;

#[derive(Debug, Default)]
struct Slot {
	latest: Option<String>,
	writing: bool,
}

/// Last-write-wins saver in front of a [`DocumentStore`].
#[derive(Clone)]
pub(super) struct Persister {
	store: Arc<dyn DocumentStore>,
	slot: Arc<Mutex<Slot>>,
}

impl Persister {
	pub(super) fn new(store: Arc<dyn DocumentStore>) -> Self {
		Self {
			store,
			slot: Arc::default(),
		}
	}

	/// Queues `text` for saving without blocking the caller.
	pub(super) fn submit(&self, text: &str) {
		{
			let mut slot = self.slot.lock();
			if slot.latest.replace(text.to_string()).is_some() {
				trace!("session.persist_coalesced");
			}
			if slot.writing {
				return;
			}
			slot.writing = true;
		}

		let this = self.clone();
		mdm_worker::spawn_blocking(TaskClass::IoBlocking, move || this.drain());
	}

	fn drain(&self) {
		loop {
			let text = {
				let mut slot = self.slot.lock();
				match slot.latest.take() {
					Some(text) => text,
					None => {
						slot.writing = false;
						return;
					}
				}
			};
			if let Err(error) = self.store.save(&text) {
				warn!(%error, "session.persist_failed");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::{Duration, Instant};

	use pretty_assertions::assert_eq;
	use tokio::time::{sleep, timeout};

	use super::*;
	use crate::storage::Result;

	/// Records every save and takes `delay` per write.
	#[derive(Default)]
	struct SlowStore {
		delay: Duration,
		saves: Mutex<Vec<String>>,
	}

	impl DocumentStore for SlowStore {
		fn load(&self) -> Result<Option<String>> {
			Ok(self.saves.lock().last().cloned())
		}

		fn save(&self, text: &str) -> Result<()> {
			std::thread::sleep(self.delay);
			self.saves.lock().push(text.to_string());
			Ok(())
		}
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn saves_do_not_block_and_the_newest_text_wins() {
		let store = Arc::new(SlowStore {
			delay: Duration::from_millis(100),
			..SlowStore::default()
		});
		let persister = Persister::new(store.clone());

		let started = Instant::now();
		for text in ["a", "ab", "abc", "abcd", "abcde"] {
			persister.submit(text);
		}
		assert!(started.elapsed() < Duration::from_millis(50), "submit must not wait for the store");

		timeout(Duration::from_secs(2), async {
			while store.load().unwrap().as_deref() != Some("abcde") {
				sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.unwrap();
		sleep(Duration::from_millis(150)).await;

		let saves = store.saves.lock().clone();
		assert!(saves.len() <= 2, "intermediate texts are coalesced: {saves:?}");
		assert_eq!(saves.last().map(String::as_str), Some("abcde"));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn saving_resumes_after_going_idle() {
		let store = Arc::new(SlowStore::default());
		let persister = Persister::new(store.clone());

		persister.submit("first");
		timeout(Duration::from_secs(2), async {
			loop {
				let idle = {
					let slot = persister.slot.lock();
					slot.latest.is_none() && !slot.writing
				};
				if idle {
					return;
				}
				sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.unwrap();

		persister.submit("second");
		timeout(Duration::from_secs(2), async {
			while store.load().unwrap().as_deref() != Some("second") {
				sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.unwrap();
		assert_eq!(store.saves.lock().clone(), vec!["first".to_string(), "second".to_string()]);
	}
}

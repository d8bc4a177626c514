//! Snapshot of the evaluator's loaded packages.

use mdm_rpc::PackageDescriptor;

/// Last package listing published to the UI.
#[derive(Debug, Clone, Default)]
pub struct PackageCache {
	snapshot: Vec<PackageDescriptor>,
}

impl PackageCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn snapshot(&self) -> &[PackageDescriptor] {
		&self.snapshot
	}

	/// Replaces the snapshot when the listing changed. Returns whether it did.
	///
	/// A null listing from the evaluator counts as empty.
	pub fn apply(&mut self, listing: Option<Vec<PackageDescriptor>>) -> bool {
		let listing = listing.unwrap_or_default();
		if same_listing(&self.snapshot, &listing) {
			return false;
		}
		self.snapshot = listing;
		true
	}
}

/// Two listings are the same when they name the same packages in the same order.
pub fn same_listing(a: &[PackageDescriptor], b: &[PackageDescriptor]) -> bool {
	a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.name == b.name)
}

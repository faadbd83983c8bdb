// ── Reactive data store ──
//
// Snapshot storage with push-based change notification.

mod collection;
mod data_store;
mod refresh;

pub use data_store::DataStore;
pub(crate) use refresh::LoadSequence;

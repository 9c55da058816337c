pub mod cache;
mod controller;
mod events;
pub mod store;

pub use cache::MatchResultCache;
pub use controller::{Confirmation, Decision, DocumentOutcome, ReviewSession};
pub use events::SessionEvent;
pub use store::{EntryId, ReviewSummary, SignatureEntry, SignatureEntryStore};

//! Request-scoped state computed on every save.
//!
//! - `change`: what changed, per locale (computed before the commit)
//! - `existence`: which locales have a committed translation (read from the store)

mod change;
mod existence;

pub use change::{ChangeSet, ChangeTracker};
pub use existence::{ExistenceMap, ExistenceTracker};

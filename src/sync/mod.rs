//! Search-side synchronization of translated entities.
//!
//! - `engine`: per-strategy write planning and concurrent dispatch
//! - `pipeline`: load/save/destroy with the store commit ordered first
//! - `reindex`: bulk rebuild of every document
//! - `report`: per-locale outcome aggregation

mod engine;
mod pipeline;
mod reindex;
mod report;

pub use engine::{SyncEngine, WriteScope};
pub use pipeline::{Record, SyncPipeline};
pub use reindex::{ReindexStats, ReindexSummary, Reindexer};
pub use report::{SyncReport, WriteAction, WriteOutcome, WriteStatus};

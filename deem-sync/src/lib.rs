//! # deem-sync
//!
//! Reconcile a desired stream of `key value` records against a key/value
//! archive and apply the difference.
//!
//! Call [`pipeline::plan`] to classify the desired stream against the
//! archive's current members, report the [`Counts`](deem_core::Counts), then
//! [`Plan::commit`](pipeline::Plan::commit) to apply the staged changes.

pub mod archive;
pub mod commit;
pub mod error;
pub mod index;
pub mod memory;
pub mod pipeline;
pub mod reconcile;
pub mod tokens;

pub use archive::{Archive, ArTool};
pub use commit::{CommitFailure, CommitReport, CommitStep};
pub use error::SyncError;
pub use index::{ArchiveState, CurrentIndex};
pub use memory::MemoryArchive;
pub use pipeline::{plan, Plan, SyncOptions};
pub use reconcile::{reconcile, Classification, Staging};
pub use tokens::{DesiredStream, Tokens};

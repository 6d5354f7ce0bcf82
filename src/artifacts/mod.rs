//! Workspace artifacts: the plan document and review decision records.
//!
//! Sub-agents write artifacts; the phase manager only reads them. A missing
//! artifact means "not ready yet", never an error.

pub mod plan;
pub mod review;
pub mod store;

pub use plan::PlanArtifact;
pub use review::{ReviewArtifact, ReviewDecision, ReviewRole};
pub use store::{ArtifactStore, FileArtifactStore};

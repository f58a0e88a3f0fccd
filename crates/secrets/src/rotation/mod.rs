//! Master-key rotation: records, audit persistence, and the orchestrator.

mod audit;
mod orchestrator;
mod record;

pub use audit::{AuditStore, FileAuditStore, MemoryAuditStore};
pub use orchestrator::{RotationOrchestrator, RotationOutcome};
pub use record::{
    ROTATION_INTERVAL_DAYS, RotationId, RotationRecord, RotationStatus,
};

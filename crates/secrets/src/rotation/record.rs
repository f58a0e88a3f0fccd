//! Rotation records and their status lifecycle.
//!
//! One [`RotationRecord`] exists per rotation attempt. The orchestrator
//! owns it for the duration of a single invocation; once a terminal status
//! is reached the record is immutable history, owned by the audit store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::RotationError;
use crate::crypto::KeyFingerprint;

/// Quarterly cadence: a completed rotation is due again after 90 days.
pub const ROTATION_INTERVAL_DAYS: i64 = 90;

/// Unique identifier for a rotation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RotationId(Uuid);

impl RotationId {
    /// Generate a new rotation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RotationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Status of a rotation attempt
///
/// # Status Transitions
///
/// ```text
/// Initiated → InProgress → Completed
///     ↓            ↓
///     → → → →  Failed
/// ```
///
/// Transitions are monotonic and one-directional; the terminal statuses are
/// exclusive and final. `Initiated` is set before any cryptographic work so
/// a crash at the very start still leaves an auditable "attempted" trace,
/// and a failure before the new key exists (e.g. key generation refused)
/// lands directly in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStatus {
    /// Record created; no cryptographic work yet
    Initiated,

    /// Old-key fingerprint recorded and new-key generation under way
    InProgress,

    /// Verification passed; the new key owns the artifact
    Completed,

    /// Verification or an I/O step failed; old key remains authoritative
    Failed,
}

impl RotationStatus {
    /// Check if transition to the target status is valid
    #[must_use]
    pub fn can_transition_to(self, target: RotationStatus) -> bool {
        use RotationStatus::{Completed, Failed, InProgress, Initiated};

        match (self, target) {
            (Initiated, InProgress) => true,
            (InProgress, Completed) => true,

            // Failure is reachable from any non-terminal status
            (Initiated | InProgress, Failed) => true,

            // Terminal statuses never transition, everything else is invalid
            _ => false,
        }
    }

    /// Check if the status is terminal
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RotationStatus::Completed | RotationStatus::Failed)
    }
}

impl std::fmt::Display for RotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RotationStatus::Initiated => "initiated",
            RotationStatus::InProgress => "in_progress",
            RotationStatus::Completed => "completed",
            RotationStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One entry per rotation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationRecord {
    /// Unique identifier
    pub id: RotationId,

    /// Current status
    pub status: RotationStatus,

    /// Fingerprint of the key being rotated away from
    pub old_key_fingerprint: Option<KeyFingerprint>,

    /// Fingerprint of the freshly generated key
    pub new_key_fingerprint: Option<KeyFingerprint>,

    /// Operator-supplied reason for the rotation
    pub reason: String,

    /// Artifacts re-encrypted during this attempt
    pub reencrypted_paths: Vec<PathBuf>,

    /// Where the pre-rotation artifact was moved, if a backup was made
    pub backup_path: Option<PathBuf>,

    /// Whether the decrypt-and-compare gate passed
    pub verification_passed: bool,

    /// Step-by-step verification observations
    pub verification_detail: BTreeMap<String, String>,

    /// Explanatory message when status is `Failed`
    pub error_message: Option<String>,

    /// When the attempt was created
    pub created_at: DateTime<Utc>,

    /// When a terminal status was reached; set exactly once
    pub completed_at: Option<DateTime<Utc>>,

    /// `completed_at` + 90 days; only meaningful when `Completed`
    pub next_rotation_due: Option<DateTime<Utc>>,
}

impl RotationRecord {
    /// Create a record in the `Initiated` status.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            id: RotationId::new(),
            status: RotationStatus::Initiated,
            old_key_fingerprint: None,
            new_key_fingerprint: None,
            reason: reason.into(),
            reencrypted_paths: Vec::new(),
            backup_path: None,
            verification_passed: false,
            verification_detail: BTreeMap::new(),
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
            next_rotation_due: None,
        }
    }

    /// Validate and perform a status transition. Reaching a terminal status
    /// stamps `completed_at`; rejected transitions leave the record as-is.
    pub fn transition_to(&mut self, target: RotationStatus) -> Result<(), RotationError> {
        if !self.status.can_transition_to(target) {
            return Err(RotationError::InvalidStateTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }

        self.status = target;
        if target.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Move to `InProgress` once both fingerprints are known.
    pub fn mark_in_progress(&mut self) -> Result<(), RotationError> {
        self.transition_to(RotationStatus::InProgress)
    }

    /// Terminal success: stamps `completed_at` and computes the quarterly
    /// due date from it.
    pub fn complete(&mut self) -> Result<(), RotationError> {
        self.transition_to(RotationStatus::Completed)?;
        self.next_rotation_due = self
            .completed_at
            .map(|at| at + Duration::days(ROTATION_INTERVAL_DAYS));
        Ok(())
    }

    /// Terminal failure with an explanatory message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), RotationError> {
        self.transition_to(RotationStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// A rotation is overdue when it completed successfully and the current
    /// time has passed its due date. Failed or in-flight attempts never
    /// count as overdue on their own.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == RotationStatus::Completed
            && self.next_rotation_due.is_some_and(|due| now > due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_forward_transitions() {
        assert!(RotationStatus::Initiated.can_transition_to(RotationStatus::InProgress));
        assert!(RotationStatus::InProgress.can_transition_to(RotationStatus::Completed));
        assert!(RotationStatus::Initiated.can_transition_to(RotationStatus::Failed));
        assert!(RotationStatus::InProgress.can_transition_to(RotationStatus::Failed));
    }

    #[test]
    fn invalid_transitions() {
        // Cannot skip InProgress
        assert!(!RotationStatus::Initiated.can_transition_to(RotationStatus::Completed));

        // Terminal statuses never move again
        assert!(!RotationStatus::Completed.can_transition_to(RotationStatus::Failed));
        assert!(!RotationStatus::Completed.can_transition_to(RotationStatus::InProgress));
        assert!(!RotationStatus::Failed.can_transition_to(RotationStatus::InProgress));
        assert!(!RotationStatus::Failed.can_transition_to(RotationStatus::Completed));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RotationStatus::Initiated.is_terminal());
        assert!(!RotationStatus::InProgress.is_terminal());
        assert!(RotationStatus::Completed.is_terminal());
        assert!(RotationStatus::Failed.is_terminal());
    }

    #[test]
    fn complete_stamps_times_once() {
        let mut record = RotationRecord::new("quarterly");
        record.mark_in_progress().unwrap();
        record.complete().unwrap();

        let completed_at = record.completed_at.expect("completed_at set");
        let due = record.next_rotation_due.expect("due date set");
        assert_eq!(due - completed_at, Duration::days(90));

        // No resurrecting a terminal record
        let err = record.fail("too late").unwrap_err();
        assert!(matches!(err, RotationError::InvalidStateTransition { .. }));
        assert_eq!(record.completed_at, Some(completed_at));
        assert_eq!(record.status, RotationStatus::Completed);
    }

    #[test]
    fn fail_records_message() {
        let mut record = RotationRecord::new("incident response");
        record.mark_in_progress().unwrap();
        record.fail("verification mismatch").unwrap();

        assert_eq!(record.status, RotationStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("verification mismatch"));
        assert!(record.completed_at.is_some());
        assert!(record.next_rotation_due.is_none());
    }

    #[test]
    fn overdue_detection() {
        let now = Utc::now();

        let mut completed = RotationRecord::new("quarterly");
        completed.mark_in_progress().unwrap();
        completed.complete().unwrap();

        // Freshly completed: due in 90 days, not overdue
        assert!(!completed.is_overdue(now));

        // Pretend the due date passed
        completed.next_rotation_due = Some(now - Duration::days(1));
        assert!(completed.is_overdue(now));

        // A failed record with a past due date is never overdue
        let mut failed = RotationRecord::new("quarterly");
        failed.mark_in_progress().unwrap();
        failed.fail("boom").unwrap();
        failed.next_rotation_due = Some(now - Duration::days(1));
        assert!(!failed.is_overdue(now));
    }

    #[test]
    fn serde_roundtrip() {
        let mut record = RotationRecord::new("quarterly");
        record.mark_in_progress().unwrap();
        record
            .verification_detail
            .insert("bytes_compared".to_string(), "42".to_string());
        record.complete().unwrap();

        let json = serde_json::to_string(&record).unwrap();
        let parsed: RotationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.status, RotationStatus::Completed);
        assert_eq!(parsed.verification_detail, record.verification_detail);
    }
}

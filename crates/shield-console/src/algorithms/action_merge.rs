//! # Action Merge
//!
//! Every inbound action shape is reduced to an [`ActionPatch`] and merged
//! over the stored [`ActionRecord`] with the same id.
//!
//! | Field | Policy |
//! |-------|--------|
//! | `id` | never changed |
//! | `action_type`, `status` | always overwritten |
//! | `created_at`, `executed_at`, `guardian_id` | overwritten when present |
//! | `guardian_tags` | overwritten when non-empty |

use chrono::{DateTime, Utc};

use crate::domain::{ActionRecord, ActionRequested, ActionResult, ActionStatus};

/// Fields carried by one action message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionPatch {
    pub id: String,
    pub action_type: String,
    pub status: ActionStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub guardian_id: Option<String>,
    pub guardian_tags: Vec<String>,
}

impl ActionPatch {
    /// Record for an id that is not stored yet.
    pub fn into_record(self) -> ActionRecord {
        ActionRecord {
            id: self.id,
            action_type: self.action_type,
            status: self.status,
            created_at: self.created_at,
            executed_at: self.executed_at,
            guardian_id: self.guardian_id,
            guardian_tags: self.guardian_tags,
        }
    }
}

impl From<ActionRequested> for ActionPatch {
    fn from(msg: ActionRequested) -> Self {
        Self {
            id: msg.action_id,
            action_type: msg.action_type,
            status: ActionStatus::Requested,
            created_at: msg.ts,
            executed_at: None,
            guardian_id: msg.guardian_id,
            guardian_tags: msg.guardian_tags,
        }
    }
}

impl From<ActionResult> for ActionPatch {
    fn from(msg: ActionResult) -> Self {
        Self {
            id: msg.action_id,
            action_type: msg.action_type,
            status: msg.status,
            created_at: None,
            executed_at: msg.ts,
            guardian_id: msg.guardian_id,
            guardian_tags: msg.guardian_tags,
        }
    }
}

impl From<ActionRecord> for ActionPatch {
    fn from(record: ActionRecord) -> Self {
        Self {
            id: record.id,
            action_type: record.action_type,
            status: record.status,
            created_at: record.created_at,
            executed_at: record.executed_at,
            guardian_id: record.guardian_id,
            guardian_tags: record.guardian_tags,
        }
    }
}

/// Merge `patch` over `existing`. Both must share an id.
pub fn merge_action(existing: &mut ActionRecord, patch: ActionPatch) {
    debug_assert_eq!(existing.id, patch.id);

    existing.action_type = patch.action_type;
    existing.status = patch.status;
    if patch.created_at.is_some() {
        existing.created_at = patch.created_at;
    }
    if patch.executed_at.is_some() {
        existing.executed_at = patch.executed_at;
    }
    if patch.guardian_id.is_some() {
        existing.guardian_id = patch.guardian_id;
    }
    if !patch.guardian_tags.is_empty() {
        existing.guardian_tags = patch.guardian_tags;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn requested() -> ActionRequested {
        ActionRequested {
            action_id: "a1".to_string(),
            action_type: "block_ip".to_string(),
            target: None,
            reason: None,
            requested_by: None,
            ts: Some(ts("2025-01-01T00:00:00Z")),
            receipt_id: None,
            guardian_id: Some("g1".to_string()),
            guardian_tags: vec!["edge".to_string()],
        }
    }

    fn result(status: &str) -> ActionResult {
        ActionResult {
            action_id: "a1".to_string(),
            action_type: "block_ip".to_string(),
            status: ActionStatus::from(status.to_string()),
            details: None,
            ts: Some(ts("2025-01-01T00:00:05Z")),
            receipt_id: None,
            guardian_id: None,
            guardian_tags: Vec::new(),
        }
    }

    #[test]
    fn test_requested_patch() {
        let record = ActionPatch::from(requested()).into_record();
        assert_eq!(record.status, ActionStatus::Requested);
        assert_eq!(record.created_at, Some(ts("2025-01-01T00:00:00Z")));
        assert!(record.executed_at.is_none());
    }

    #[test]
    fn test_result_preserves_absent_fields() {
        let mut record = ActionPatch::from(requested()).into_record();
        merge_action(&mut record, result("applied").into());

        assert_eq!(record.status, ActionStatus::Applied);
        assert_eq!(record.created_at, Some(ts("2025-01-01T00:00:00Z")));
        assert_eq!(record.executed_at, Some(ts("2025-01-01T00:00:05Z")));
        assert_eq!(record.guardian_id.as_deref(), Some("g1"));
        assert_eq!(record.guardian_tags, vec!["edge".to_string()]);
    }

    #[test]
    fn test_status_always_overwritten() {
        let mut record = ActionPatch::from(result("applied")).into_record();
        // A late "requested" still wins: last processed message decides
        merge_action(&mut record, requested().into());
        assert_eq!(record.status, ActionStatus::Requested);
        assert_eq!(record.executed_at, Some(ts("2025-01-01T00:00:05Z")));
    }

    #[test]
    fn test_present_fields_overwrite() {
        let mut record = ActionPatch::from(requested()).into_record();
        let mut update = result("failed");
        update.guardian_id = Some("g2".to_string());
        update.guardian_tags = vec!["core".to_string()];
        merge_action(&mut record, update.into());
        assert_eq!(record.guardian_id.as_deref(), Some("g2"));
        assert_eq!(record.guardian_tags, vec!["core".to_string()]);
        assert_eq!(record.id, "a1");
    }
}

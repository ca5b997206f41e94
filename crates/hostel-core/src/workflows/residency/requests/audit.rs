use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, EntityId, EntityKind, RequestKind};

/// What a recorded action was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    GuestApproval,
    LeaveApproval,
    MaintenanceApproval,
    PassGeneration,
    PassVerification,
    ConflictDetection,
    SystemAction,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::GuestApproval => "guest_approval",
            AuditAction::LeaveApproval => "leave_approval",
            AuditAction::MaintenanceApproval => "maintenance_approval",
            AuditAction::PassGeneration => "pass_generation",
            AuditAction::PassVerification => "pass_verification",
            AuditAction::ConflictDetection => "conflict_detection",
            AuditAction::SystemAction => "system_action",
        }
    }

    /// The approval action matching a request kind.
    pub const fn for_request(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Guest => AuditAction::GuestApproval,
            RequestKind::Leave => AuditAction::LeaveApproval,
            RequestKind::Maintenance => AuditAction::MaintenanceApproval,
        }
    }
}

/// Outcome recorded alongside an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    Approved,
    Rejected,
    Escalated,
    Processed,
    Failed,
}

impl AuditDecision {
    pub const fn label(self) -> &'static str {
        match self {
            AuditDecision::Approved => "approved",
            AuditDecision::Rejected => "rejected",
            AuditDecision::Escalated => "escalated",
            AuditDecision::Processed => "processed",
            AuditDecision::Failed => "failed",
        }
    }
}

/// Immutable record of one decision. The audit log is append-only and is
/// the sole source of truth for why a decision was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: EntityId,
    pub action: AuditAction,
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub decision: AuditDecision,
    pub reasoning: String,
    pub confidence: f32,
    pub rules_applied: Vec<String>,
    pub actor: Actor,
    pub recorded_at: DateTime<Utc>,
}

static AUDIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_audit_id() -> EntityId {
    let id = AUDIT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EntityId(format!("audit-{id:06}"))
}

/// Read-only filter over the audit log. Every present condition must hold;
/// results are returned newest-first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub entity_id: Option<EntityId>,
    pub actor: Option<Actor>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn for_entity(entity_id: EntityId) -> Self {
        Self {
            entity_id: Some(entity_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(entity_id) = &self.entity_id {
            if &entry.entity_id != entity_id {
                return false;
            }
        }
        if let Some(actor) = &self.actor {
            if &entry.actor != actor {
                return false;
            }
        }
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.recorded_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.recorded_at > to {
                return false;
            }
        }
        true
    }
}

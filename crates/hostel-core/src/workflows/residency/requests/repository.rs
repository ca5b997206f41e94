use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{AuditEntry, AuditQuery};
use super::domain::{EntityId, Request, RequestStatus, StaffMember, StaffRole, Student};
use super::passes::{DigitalPass, PassQuery, PassStatus};
use super::policy::{Evaluation, EscalationRoute};

/// Persisted request together with its evaluation and decision metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request: Request,
    pub evaluation: Option<Evaluation>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    pub fn decision_rationale(&self) -> String {
        if let Some(reason) = &self.request.approval_reason {
            return reason.clone();
        }
        match &self.evaluation {
            Some(evaluation) => evaluation.reasoning.clone(),
            None => "pending evaluation".to_string(),
        }
    }

    pub fn status_view(&self) -> RequestStatusView {
        RequestStatusView {
            request_id: self.request.id.clone(),
            student_id: self.request.student_id.clone(),
            kind: self.request.kind().label(),
            status: self.request.status.label(),
            auto_approved: self.request.auto_approved,
            decision_rationale: self.decision_rationale(),
            approved_by: self.request.approved_by.clone(),
            route: self
                .evaluation
                .as_ref()
                .filter(|_| self.request.status.is_pending())
                .and_then(|evaluation| evaluation.route),
            created_at: self.request.created_at,
            decided_at: self.decided_at,
        }
    }
}

/// Sanitized request representation exposed to callers and dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct RequestStatusView {
    pub request_id: EntityId,
    pub student_id: EntityId,
    pub kind: &'static str,
    pub status: &'static str,
    pub auto_approved: bool,
    pub decision_rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<EscalationRoute>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

/// Storage abstraction so the service can be exercised in isolation.
/// `commit_decision` is the single transactional surface: the status
/// compare-and-swap and any issued pass land together or not at all.
pub trait RequestStore: Send + Sync {
    fn student(&self, id: &EntityId) -> Result<Option<Student>, StoreError>;
    fn students(&self) -> Result<Vec<Student>, StoreError>;
    fn staff_member(&self, id: &EntityId) -> Result<Option<StaffMember>, StoreError>;

    fn insert_request(&self, record: RequestRecord) -> Result<RequestRecord, StoreError>;
    fn request(&self, id: &EntityId) -> Result<Option<RequestRecord>, StoreError>;
    fn requests(&self) -> Result<Vec<RequestRecord>, StoreError>;
    fn pending_requests(&self, limit: usize) -> Result<Vec<RequestRecord>, StoreError>;

    /// Commit a decision against an expected prior status. Fails with
    /// `StoreError::StaleStatus` when another writer got there first, in
    /// which case nothing is written.
    fn commit_decision(
        &self,
        record: RequestRecord,
        expected: RequestStatus,
        pass: Option<DigitalPass>,
    ) -> Result<(), StoreError>;

    fn pass(&self, id: &EntityId) -> Result<Option<DigitalPass>, StoreError>;
    fn pass_by_number(&self, pass_number: &str) -> Result<Option<DigitalPass>, StoreError>;
    fn pass_for_request(&self, request_id: &EntityId) -> Result<Option<DigitalPass>, StoreError>;
    fn passes(&self, query: &PassQuery) -> Result<Vec<DigitalPass>, StoreError>;
    fn update_pass_status(&self, id: &EntityId, status: PassStatus) -> Result<(), StoreError>;

    fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError>;
    fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("stored status no longer matches the expected state")]
    StaleStatus,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Kinds of notification emitted after decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEventKind {
    Approved,
    Rejected,
    Escalated,
    UrgentAlert,
}

impl RequestEventKind {
    pub const fn label(self) -> &'static str {
        match self {
            RequestEventKind::Approved => "approved",
            RequestEventKind::Rejected => "rejected",
            RequestEventKind::Escalated => "escalated",
            RequestEventKind::UrgentAlert => "urgent_alert",
        }
    }
}

/// Where an event is delivered: a specific student, or a staff queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    Student { id: EntityId },
    StaffQueue { role: StaffRole },
}

/// Fire-and-forget payload handed to the notification channel. Delivery
/// success is never observed by the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    pub kind: RequestEventKind,
    pub request_id: EntityId,
    pub recipient: Recipient,
    pub summary: String,
}

/// Outbound delivery seam; email and SMS adapters live behind it.
pub trait NotificationChannel: Send + Sync {
    fn publish(&self, event: RequestEvent) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

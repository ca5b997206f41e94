use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier used uniformly for students, staff, requests, passes,
/// and audit entries. Nothing parses its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Resident on whose behalf requests are raised. Read-heavy after
/// provisioning; only `violation_count` changes in normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: EntityId,
    pub name: String,
    pub room_number: String,
    pub block: String,
    pub violation_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// A clean record means auto-approval paths stay open.
    pub fn has_clean_record(&self) -> bool {
        self.violation_count == 0
    }
}

/// Staff roles; used for authorization and `approved_by` attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Warden,
    Security,
    Admin,
    Maintenance,
}

impl StaffRole {
    pub const fn label(self) -> &'static str {
        match self {
            StaffRole::Warden => "warden",
            StaffRole::Security => "security",
            StaffRole::Admin => "admin",
            StaffRole::Maintenance => "maintenance",
        }
    }

    /// Which request kinds this role may decide. Security staff verify
    /// passes at the gate but never decide requests.
    pub const fn may_decide(self, kind: RequestKind) -> bool {
        matches!(
            (self, kind),
            (StaffRole::Admin, _)
                | (StaffRole::Warden, RequestKind::Guest)
                | (StaffRole::Warden, RequestKind::Leave)
                | (StaffRole::Maintenance, RequestKind::Maintenance)
        )
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: EntityId,
    pub name: String,
    pub role: StaffRole,
    pub active: bool,
}

/// Discriminant over the three request variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Guest,
    Leave,
    Maintenance,
}

impl RequestKind {
    pub const fn label(self) -> &'static str {
        match self {
            RequestKind::Guest => "guest",
            RequestKind::Leave => "leave",
            RequestKind::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw submission payload as received from the caller, before intake
/// validation. Malformed submissions are rejected without being persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestSubmission {
    Guest(GuestSubmission),
    Leave(LeaveSubmission),
    Maintenance(MaintenanceSubmission),
}

impl RequestSubmission {
    pub const fn kind(&self) -> RequestKind {
        match self {
            RequestSubmission::Guest(_) => RequestKind::Guest,
            RequestSubmission::Leave(_) => RequestKind::Leave,
            RequestSubmission::Maintenance(_) => RequestKind::Maintenance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestSubmission {
    pub guest_name: String,
    pub relationship: Option<String>,
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveSubmission {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceSubmission {
    pub room_number: String,
    pub category: MaintenanceCategory,
    pub description: String,
    pub priority: MaintenancePriority,
}

/// Maintenance issue categories. Basic categories qualify for automatic
/// work-order creation; the rest go through staff triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceCategory {
    Plumbing,
    ElectricalMinor,
    ElectricalMajor,
    Furniture,
    Cleaning,
    AcRepair,
    Structural,
    Other,
}

impl MaintenanceCategory {
    pub const fn label(self) -> &'static str {
        match self {
            MaintenanceCategory::Plumbing => "plumbing",
            MaintenanceCategory::ElectricalMinor => "electrical_minor",
            MaintenanceCategory::ElectricalMajor => "electrical_major",
            MaintenanceCategory::Furniture => "furniture",
            MaintenanceCategory::Cleaning => "cleaning",
            MaintenanceCategory::AcRepair => "ac_repair",
            MaintenanceCategory::Structural => "structural",
            MaintenanceCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    Medium,
    High,
    Emergency,
}

impl MaintenancePriority {
    pub const fn label(self) -> &'static str {
        match self {
            MaintenancePriority::Low => "low",
            MaintenancePriority::Medium => "medium",
            MaintenancePriority::High => "high",
            MaintenancePriority::Emergency => "emergency",
        }
    }
}

/// Validated, type-specific payload carried by a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestDetails {
    Guest(GuestVisit),
    Leave(LeaveSpan),
    Maintenance(MaintenanceIssue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestVisit {
    pub guest_name: String,
    pub relationship: Option<String>,
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub purpose: Option<String>,
}

impl GuestVisit {
    /// Nights counted for policy purposes. A stay that crosses midnight but
    /// lasts under 24 hours still counts as one night.
    pub fn nights(&self) -> i64 {
        let span = self.departure - self.arrival;
        let nights = span.num_days();
        if nights == 0 && span.num_seconds() > 0 {
            1
        } else {
            nights
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveSpan {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub emergency_contact: Option<String>,
}

impl LeaveSpan {
    /// Inclusive day count: a leave starting and ending on the same date is
    /// one day.
    pub fn total_days(&self) -> i64 {
        (self.to_date - self.from_date).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceIssue {
    pub room_number: String,
    pub category: MaintenanceCategory,
    pub description: String,
    pub priority: MaintenancePriority,
    /// Set when the work order is approved: same day for emergencies,
    /// next day otherwise.
    pub scheduled_for: Option<NaiveDate>,
}

/// Lifecycle states. Every transition out of `pending` is a decision that
/// cannot be reversed; `expired` is reached from `approved` by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Expired => "expired",
        }
    }

    pub const fn is_pending(self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A student request moving through the shared lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: EntityId,
    pub student_id: EntityId,
    pub details: RequestDetails,
    pub status: RequestStatus,
    pub auto_approved: bool,
    pub approval_reason: Option<String>,
    pub approved_by: Option<EntityId>,
    pub created_at: DateTime<Utc>,
}

impl Request {
    pub const fn kind(&self) -> RequestKind {
        match self.details {
            RequestDetails::Guest(_) => RequestKind::Guest,
            RequestDetails::Leave(_) => RequestKind::Leave,
            RequestDetails::Maintenance(_) => RequestKind::Maintenance,
        }
    }

    /// Validity window as whole days, for overlap checks and expiry.
    /// Maintenance requests carry no window.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        match &self.details {
            RequestDetails::Guest(visit) => {
                Some((visit.arrival.date_naive(), visit.departure.date_naive()))
            }
            RequestDetails::Leave(span) => Some((span.from_date, span.to_date)),
            RequestDetails::Maintenance(_) => None,
        }
    }
}

/// Entity vocabulary shared by audit records and not-found errors.
/// `System` marks run-level audit entries not tied to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Student,
    Staff,
    Request,
    Pass,
    System,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Staff => "staff",
            EntityKind::Request => "request",
            EntityKind::Pass => "pass",
            EntityKind::System => "system",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity performing an operation. Every entry point takes one
/// explicitly; there is no ambient user context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    System,
    Student(EntityId),
    Staff(EntityId),
}

impl Actor {
    pub const fn label(&self) -> &'static str {
        match self {
            Actor::System => "system",
            Actor::Student(_) => "student",
            Actor::Staff(_) => "staff",
        }
    }

    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            Actor::System => None,
            Actor::Student(id) | Actor::Staff(id) => Some(id),
        }
    }
}

/// Staff decision applied to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffDecision {
    Approve,
    Reject,
}

impl StaffDecision {
    pub const fn label(self) -> &'static str {
        match self {
            StaffDecision::Approve => "approve",
            StaffDecision::Reject => "reject",
        }
    }
}

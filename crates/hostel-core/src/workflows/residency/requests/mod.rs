//! Student request intake, policy evaluation, digital passes, and audit.
//!
//! Guest, leave, and maintenance requests share one lifecycle: intake
//! validation, deterministic policy evaluation, then auto-approval,
//! escalation to a staff queue, or rejection. Approved leave carries a
//! verifiable digital pass, and every decision lands in the append-only
//! audit log.

pub mod audit;
pub mod domain;
pub(crate) mod intake;
pub mod passes;
pub(crate) mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use audit::{AuditAction, AuditDecision, AuditEntry, AuditQuery};
pub use domain::{
    Actor, EntityId, EntityKind, GuestSubmission, GuestVisit, LeaveSpan, LeaveSubmission,
    MaintenanceCategory, MaintenanceIssue, MaintenancePriority, MaintenanceSubmission, Request,
    RequestDetails, RequestKind, RequestStatus, RequestSubmission, StaffDecision, StaffMember,
    StaffRole, Student,
};
pub use intake::{IntakeGuard, IntakePolicy, ValidationError};
pub use passes::{
    DigitalPass, IssuanceError, PassApproval, PassIssuer, PassQuery, PassRenderer, PassStatus,
    PassVerification, RenderError, TextPassRenderer,
};
pub use policy::{
    Evaluation, EscalationPriority, EscalationRoute, PolicyConfig, PolicyEngine, Verdict,
};
pub use repository::{
    NotificationChannel, NotifyError, Recipient, RequestEvent, RequestEventKind, RequestRecord,
    RequestStatusView, RequestStore, StoreError,
};
pub use router::request_router;
pub use service::{
    AuthorizationError, DecisionInput, ExpirySweep, RequestService, RequestServiceError,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::super::conflicts::{Conflict, ConflictChecker};
use super::super::report::DailyReport;
use super::audit::{next_audit_id, AuditAction, AuditDecision, AuditEntry, AuditQuery};
use super::domain::{
    Actor, EntityId, EntityKind, MaintenancePriority, Request, RequestDetails, RequestKind,
    RequestStatus, RequestSubmission, StaffDecision, StaffRole, Student,
};
use super::intake::{IntakeGuard, ValidationError};
use super::passes::{
    DigitalPass, IssuanceError, PassApproval, PassIssuer, PassQuery, PassRenderer, PassStatus,
    PassVerification,
};
use super::policy::{PolicyConfig, PolicyEngine, Verdict};
use super::repository::{
    NotificationChannel, Recipient, RequestEvent, RequestEventKind, RequestRecord, RequestStore,
    StoreError,
};

const DEFAULT_APPROVAL_REASON: &str = "Approved by staff";
const MANUAL_CONFIDENCE: f32 = 0.9;
const PASS_NUMBER_ATTEMPTS: usize = 8;

/// Service composing intake, policy evaluation, persistence, pass
/// issuance, audit, and notification dispatch.
pub struct RequestService<S, N> {
    intake: IntakeGuard,
    policy: PolicyEngine,
    issuer: PassIssuer,
    checker: ConflictChecker,
    store: Arc<S>,
    notifier: Arc<N>,
    renderer: Option<Box<dyn PassRenderer>>,
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> EntityId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EntityId(format!("req-{id:06}"))
}

impl<S, N> RequestService<S, N>
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self::with_policy(store, notifier, PolicyConfig::standard())
    }

    pub fn with_policy(store: Arc<S>, notifier: Arc<N>, config: PolicyConfig) -> Self {
        Self {
            intake: IntakeGuard::from_config(&config),
            policy: PolicyEngine::new(config),
            issuer: PassIssuer::new(),
            checker: ConflictChecker::default(),
            store,
            notifier,
            renderer: None,
        }
    }

    pub fn with_checker(mut self, checker: ConflictChecker) -> Self {
        self.checker = checker;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn PassRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Submit a request on behalf of a student. Malformed submissions fail
    /// validation and are never persisted; everything else is stored and
    /// evaluated, with exactly one audit entry for the evaluation.
    pub fn submit(
        &self,
        student_id: EntityId,
        submission: RequestSubmission,
    ) -> Result<RequestRecord, RequestServiceError> {
        let now = Utc::now();
        let today = now.date_naive();

        let student =
            self.store
                .student(&student_id)?
                .ok_or_else(|| RequestServiceError::NotFound {
                    kind: EntityKind::Student,
                    id: student_id.clone(),
                })?;

        let details = self.intake.details_from_submission(submission, today)?;

        let request = Request {
            id: next_request_id(),
            student_id,
            details,
            status: RequestStatus::Pending,
            auto_approved: false,
            approval_reason: None,
            approved_by: None,
            created_at: now,
        };

        let evaluation = self.policy.evaluate(&request, &student, now);
        if evaluation.verdict == Verdict::Invalid {
            // Intake screens malformed submissions first; this arm only
            // fires if the two layers ever disagree.
            return Err(ValidationError::MissingField {
                field: "submission",
            }
            .into());
        }

        let mut record = self.store.insert_request(RequestRecord {
            request,
            evaluation: Some(evaluation.clone()),
            decided_at: None,
        })?;

        let mut pass = None;
        match evaluation.verdict {
            Verdict::AutoApprove => {
                record.request.status = RequestStatus::Approved;
                record.request.auto_approved = true;
                record.request.approval_reason = Some(evaluation.reasoning.clone());
                record.decided_at = Some(now);
                schedule_maintenance(&mut record.request, today);

                if record.request.kind() == RequestKind::Leave {
                    pass = Some(self.issue_unique_pass(
                        &record.request,
                        PassApproval::Auto,
                        now,
                    )?);
                }
                self.commit_pending_decision(record.clone(), pass.clone())?;
            }
            Verdict::Reject => {
                record.request.status = RequestStatus::Rejected;
                record.request.approval_reason = Some(evaluation.reasoning.clone());
                record.decided_at = Some(now);
                self.commit_pending_decision(record.clone(), None)?;
            }
            // invalid verdicts returned above, before anything was stored
            Verdict::Escalate | Verdict::Invalid => {}
        }

        self.store.append_audit(AuditEntry {
            id: next_audit_id(),
            action: AuditAction::for_request(record.request.kind()),
            entity_kind: EntityKind::Request,
            entity_id: record.request.id.clone(),
            decision: decision_from_verdict(evaluation.verdict),
            reasoning: evaluation.reasoning.clone(),
            confidence: evaluation.confidence,
            rules_applied: evaluation.rules_applied.clone(),
            actor: Actor::System,
            recorded_at: now,
        })?;

        if let Some(pass) = &pass {
            self.record_pass_issued(pass, &student, Actor::System, now)?;
        }

        match evaluation.verdict {
            Verdict::AutoApprove => {
                self.dispatch(RequestEvent {
                    kind: RequestEventKind::Approved,
                    request_id: record.request.id.clone(),
                    recipient: Recipient::Student {
                        id: record.request.student_id.clone(),
                    },
                    summary: evaluation.reasoning.clone(),
                });
                if evaluation.urgent_alert {
                    if let RequestDetails::Maintenance(issue) = &record.request.details {
                        self.dispatch(RequestEvent {
                            kind: RequestEventKind::UrgentAlert,
                            request_id: record.request.id.clone(),
                            recipient: Recipient::StaffQueue {
                                role: StaffRole::Maintenance,
                            },
                            summary: format!(
                                "Emergency {} reported in room {}",
                                issue.category.label(),
                                issue.room_number
                            ),
                        });
                    }
                }
            }
            Verdict::Reject => {
                self.dispatch(RequestEvent {
                    kind: RequestEventKind::Rejected,
                    request_id: record.request.id.clone(),
                    recipient: Recipient::Student {
                        id: record.request.student_id.clone(),
                    },
                    summary: evaluation.reasoning.clone(),
                });
            }
            Verdict::Escalate => {
                let role = evaluation
                    .route
                    .map(|route| route.assignee)
                    .unwrap_or(StaffRole::Warden);
                self.dispatch(RequestEvent {
                    kind: RequestEventKind::Escalated,
                    request_id: record.request.id.clone(),
                    recipient: Recipient::StaffQueue { role },
                    summary: evaluation.reasoning.clone(),
                });
            }
            Verdict::Invalid => {}
        }

        Ok(record)
    }

    /// Apply a staff decision to a pending request. Approving a leave
    /// request issues the pass inside the same store commit.
    pub fn staff_decide(
        &self,
        request_id: &EntityId,
        input: DecisionInput,
    ) -> Result<RequestRecord, RequestServiceError> {
        let now = Utc::now();
        let today = now.date_naive();

        let mut record =
            self.store
                .request(request_id)?
                .ok_or_else(|| RequestServiceError::NotFound {
                    kind: EntityKind::Request,
                    id: request_id.clone(),
                })?;

        let staff = match self.store.staff_member(&input.staff_id)? {
            Some(staff) => staff,
            None => {
                // Students cannot decide requests, not even their own.
                if self.store.student(&input.staff_id)?.is_some() {
                    return Err(AuthorizationError::NotStaff {
                        actor_id: input.staff_id,
                    }
                    .into());
                }
                return Err(RequestServiceError::NotFound {
                    kind: EntityKind::Staff,
                    id: input.staff_id,
                });
            }
        };

        if !staff.active {
            return Err(AuthorizationError::InactiveStaff { staff_id: staff.id }.into());
        }
        let kind = record.request.kind();
        if !staff.role.may_decide(kind) {
            return Err(AuthorizationError::RoleMismatch {
                role: staff.role,
                kind,
            }
            .into());
        }

        if !record.request.status.is_pending() {
            return Err(RequestServiceError::StateConflict {
                request_id: request_id.clone(),
                status: record.request.status,
            });
        }

        let reason = match input.decision {
            StaffDecision::Approve => input
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .unwrap_or(DEFAULT_APPROVAL_REASON)
                .to_string(),
            StaffDecision::Reject => {
                let trimmed = input.reason.as_deref().map(str::trim).unwrap_or("");
                if trimmed.is_empty() {
                    return Err(ValidationError::MissingRejectionReason.into());
                }
                trimmed.to_string()
            }
        };

        record.request.status = match input.decision {
            StaffDecision::Approve => RequestStatus::Approved,
            StaffDecision::Reject => RequestStatus::Rejected,
        };
        record.request.approval_reason = Some(reason.clone());
        record.request.approved_by = Some(staff.id.clone());
        record.decided_at = Some(now);
        if input.decision == StaffDecision::Approve {
            schedule_maintenance(&mut record.request, today);
        }

        let pass = if input.decision == StaffDecision::Approve && kind == RequestKind::Leave {
            Some(self.issue_unique_pass(
                &record.request,
                PassApproval::Manual {
                    staff_id: staff.id.clone(),
                },
                now,
            )?)
        } else {
            None
        };

        self.commit_pending_decision(record.clone(), pass.clone())?;

        let decision = match input.decision {
            StaffDecision::Approve => AuditDecision::Approved,
            StaffDecision::Reject => AuditDecision::Rejected,
        };
        self.store.append_audit(AuditEntry {
            id: next_audit_id(),
            action: AuditAction::for_request(kind),
            entity_kind: EntityKind::Request,
            entity_id: record.request.id.clone(),
            decision,
            reasoning: reason.clone(),
            confidence: MANUAL_CONFIDENCE,
            rules_applied: vec!["staff_decision".to_string()],
            actor: Actor::Staff(staff.id.clone()),
            recorded_at: now,
        })?;

        if let Some(pass) = &pass {
            let student = self.store.student(&record.request.student_id)?.ok_or_else(|| {
                RequestServiceError::NotFound {
                    kind: EntityKind::Student,
                    id: record.request.student_id.clone(),
                }
            })?;
            self.record_pass_issued(pass, &student, Actor::Staff(staff.id.clone()), now)?;
        }

        let event_kind = match input.decision {
            StaffDecision::Approve => RequestEventKind::Approved,
            StaffDecision::Reject => RequestEventKind::Rejected,
        };
        self.dispatch(RequestEvent {
            kind: event_kind,
            request_id: record.request.id.clone(),
            recipient: Recipient::Student {
                id: record.request.student_id.clone(),
            },
            summary: reason,
        });

        Ok(record)
    }

    /// Fetch one request with its evaluation and decision metadata.
    pub fn request(&self, request_id: &EntityId) -> Result<RequestRecord, RequestServiceError> {
        self.store
            .request(request_id)?
            .ok_or_else(|| RequestServiceError::NotFound {
                kind: EntityKind::Request,
                id: request_id.clone(),
            })
    }

    /// Pending requests awaiting staff, oldest first, capped at `limit`.
    pub fn pending_requests(
        &self,
        limit: usize,
    ) -> Result<Vec<RequestRecord>, RequestServiceError> {
        Ok(self.store.pending_requests(limit)?)
    }

    /// Pass history for one student, newest first.
    pub fn pass_history(
        &self,
        student_id: &EntityId,
        status: Option<PassStatus>,
    ) -> Result<Vec<DigitalPass>, RequestServiceError> {
        if self.store.student(student_id)?.is_none() {
            return Err(RequestServiceError::NotFound {
                kind: EntityKind::Student,
                id: student_id.clone(),
            });
        }
        let query = PassQuery {
            student_id: Some(student_id.clone()),
            status,
            active_on: None,
        };
        Ok(self.store.passes(&query)?)
    }

    /// The pass issued for a request, if any.
    pub fn pass_for_request(
        &self,
        request_id: &EntityId,
    ) -> Result<Option<DigitalPass>, RequestServiceError> {
        Ok(self.store.pass_for_request(request_id)?)
    }

    /// Gate-side check of a pass number. An unknown number is a negative
    /// verification, not an error; every check is audited.
    pub fn verify_pass(
        &self,
        pass_number: &str,
        actor: Actor,
    ) -> Result<PassVerification, RequestServiceError> {
        let now = Utc::now();
        let today = now.date_naive();

        let verification = match self.store.pass_by_number(pass_number)? {
            Some(pass) => {
                let student = self.store.student(&pass.student_id)?;
                PassVerification::checked(&pass, student.as_ref(), today)
            }
            None => PassVerification::unknown(pass_number),
        };

        self.store.append_audit(AuditEntry {
            id: next_audit_id(),
            action: AuditAction::PassVerification,
            entity_kind: EntityKind::Pass,
            entity_id: EntityId::new(pass_number),
            decision: AuditDecision::Processed,
            reasoning: verification.message.clone(),
            confidence: 1.0,
            rules_applied: Vec::new(),
            actor,
            recorded_at: now,
        })?;

        Ok(verification)
    }

    /// Expire approved guest/leave requests whose window ended before
    /// `today`, and active passes past their end date. Idempotent.
    pub fn expire_overdue(&self, today: NaiveDate) -> Result<ExpirySweep, RequestServiceError> {
        let now = Utc::now();
        let mut sweep = ExpirySweep::default();

        for mut record in self.store.requests()? {
            if record.request.status != RequestStatus::Approved {
                continue;
            }
            let Some((_, end)) = record.request.window() else {
                continue;
            };
            if end >= today {
                continue;
            }

            let id = record.request.id.clone();
            record.request.status = RequestStatus::Expired;
            record.decided_at = Some(now);
            match self
                .store
                .commit_decision(record, RequestStatus::Approved, None)
            {
                Ok(()) => {}
                // another sweep or writer got there first
                Err(StoreError::StaleStatus) => continue,
                Err(err) => return Err(err.into()),
            }

            self.store.append_audit(AuditEntry {
                id: next_audit_id(),
                action: AuditAction::SystemAction,
                entity_kind: EntityKind::Request,
                entity_id: id.clone(),
                decision: AuditDecision::Processed,
                reasoning: format!("Request expired: validity window ended before {today}"),
                confidence: 1.0,
                rules_applied: Vec::new(),
                actor: Actor::System,
                recorded_at: now,
            })?;
            sweep.expired_requests.push(id);
        }

        let active = PassQuery {
            status: Some(PassStatus::Active),
            ..PassQuery::default()
        };
        for pass in self.store.passes(&active)? {
            if pass.to_date >= today {
                continue;
            }
            self.store.update_pass_status(&pass.id, PassStatus::Expired)?;
            self.store.append_audit(AuditEntry {
                id: next_audit_id(),
                action: AuditAction::SystemAction,
                entity_kind: EntityKind::Pass,
                entity_id: pass.id.clone(),
                decision: AuditDecision::Processed,
                reasoning: format!("Pass {} expired: window ended before {today}", pass.pass_number),
                confidence: 1.0,
                rules_applied: Vec::new(),
                actor: Actor::System,
                recorded_at: now,
            })?;
            sweep.expired_passes.push(pass.id);
        }

        Ok(sweep)
    }

    /// Scan stored records for inconsistencies. The scan itself is pure;
    /// a run that finds conflicts is audited once as a system action.
    pub fn run_nightly_check(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<Conflict>, RequestServiceError> {
        let now = Utc::now();
        let records = self.store.requests()?;
        let passes = self.store.passes(&PassQuery::default())?;
        let students = self.store.students()?;

        let conflicts = self.checker.scan(&records, &passes, &students, today, now);

        if !conflicts.is_empty() {
            self.store.append_audit(AuditEntry {
                id: next_audit_id(),
                action: AuditAction::ConflictDetection,
                entity_kind: EntityKind::System,
                entity_id: EntityId::new(format!("nightly-{today}")),
                decision: AuditDecision::Processed,
                reasoning: format!("Nightly check found {} conflict(s)", conflicts.len()),
                confidence: 1.0,
                rules_applied: conflicts
                    .iter()
                    .map(|conflict| conflict.kind.label().to_string())
                    .collect(),
                actor: Actor::System,
                recorded_at: now,
            })?;
            warn!(count = conflicts.len(), "nightly check found conflicts");
        }

        Ok(conflicts)
    }

    /// Compile the morning operational snapshot for staff.
    pub fn morning_report(&self, today: NaiveDate) -> Result<DailyReport, RequestServiceError> {
        let records = self.store.requests()?;
        let students = self.store.students()?;
        Ok(DailyReport::compile(&records, &students, today))
    }

    /// Filtered view over the audit log, newest first.
    pub fn audit_trail(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, RequestServiceError> {
        Ok(self.store.audit_entries(query)?)
    }

    /// Mint a pass whose number is unused. The suffix space is small, so
    /// collisions are retried with fresh randomness.
    fn issue_unique_pass(
        &self,
        request: &Request,
        approval: PassApproval,
        issued_at: DateTime<Utc>,
    ) -> Result<DigitalPass, RequestServiceError> {
        for _ in 0..PASS_NUMBER_ATTEMPTS {
            let pass = self.issuer.issue(request, approval.clone(), issued_at)?;
            if self.store.pass_by_number(&pass.pass_number)?.is_none() {
                return Ok(pass);
            }
        }
        Err(RequestServiceError::Store(StoreError::Unavailable(
            "pass number space exhausted".to_string(),
        )))
    }

    /// Commit a decision through the store's compare-and-swap, translating
    /// a lost race into `StateConflict` carrying the status that won.
    fn commit_pending_decision(
        &self,
        record: RequestRecord,
        pass: Option<DigitalPass>,
    ) -> Result<(), RequestServiceError> {
        let request_id = record.request.id.clone();
        match self
            .store
            .commit_decision(record, RequestStatus::Pending, pass)
        {
            Ok(()) => Ok(()),
            Err(StoreError::StaleStatus) => {
                let status = self
                    .store
                    .request(&request_id)?
                    .map(|current| current.request.status)
                    .unwrap_or(RequestStatus::Pending);
                Err(RequestServiceError::StateConflict { request_id, status })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn record_pass_issued(
        &self,
        pass: &DigitalPass,
        student: &Student,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<(), RequestServiceError> {
        self.store.append_audit(AuditEntry {
            id: next_audit_id(),
            action: AuditAction::PassGeneration,
            entity_kind: EntityKind::Pass,
            entity_id: pass.id.clone(),
            decision: AuditDecision::Processed,
            reasoning: format!(
                "Pass {} issued for request {}",
                pass.pass_number, pass.request_id
            ),
            confidence: 1.0,
            rules_applied: Vec::new(),
            actor,
            recorded_at: now,
        })?;

        // Rendering is presentation only and never fails issuance.
        if let Some(renderer) = &self.renderer {
            match renderer.render(pass, student) {
                Ok(document) => {
                    debug!(pass = %pass.pass_number, bytes = document.len(), "pass document rendered");
                }
                Err(err) => {
                    warn!(pass = %pass.pass_number, error = %err, "pass document rendering failed");
                }
            }
        }
        Ok(())
    }

    /// Notifications are fire-and-forget: state, audit, and pass are
    /// already committed, so a channel failure is logged and dropped.
    fn dispatch(&self, event: RequestEvent) {
        if let Err(err) = self.notifier.publish(event) {
            warn!(error = %err, "notification dropped");
        }
    }
}

fn schedule_maintenance(request: &mut Request, today: NaiveDate) {
    if let RequestDetails::Maintenance(issue) = &mut request.details {
        if issue.scheduled_for.is_none() {
            let date = if issue.priority == MaintenancePriority::Emergency {
                today
            } else {
                today + Duration::days(1)
            };
            issue.scheduled_for = Some(date);
        }
    }
}

const fn decision_from_verdict(verdict: Verdict) -> AuditDecision {
    match verdict {
        Verdict::AutoApprove => AuditDecision::Approved,
        Verdict::Reject => AuditDecision::Rejected,
        Verdict::Escalate => AuditDecision::Escalated,
        Verdict::Invalid => AuditDecision::Failed,
    }
}

/// Staff decision payload applied to a pending request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub staff_id: EntityId,
    pub decision: StaffDecision,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpirySweep {
    pub expired_requests: Vec<EntityId>,
    pub expired_passes: Vec<EntityId>,
}

impl ExpirySweep {
    pub fn is_empty(&self) -> bool {
        self.expired_requests.is_empty() && self.expired_passes.is_empty()
    }
}

/// Refusals of a staff decision on identity grounds.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("{actor_id} is not a staff member")]
    NotStaff { actor_id: EntityId },
    #[error("staff member {staff_id} is deactivated")]
    InactiveStaff { staff_id: EntityId },
    #[error("role {role} cannot decide {kind} requests")]
    RoleMismatch { role: StaffRole, kind: RequestKind },
}

/// Error raised by the request service.
#[derive(Debug, thiserror::Error)]
pub enum RequestServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },
    #[error("request {request_id} is already {status}")]
    StateConflict {
        request_id: EntityId,
        status: RequestStatus,
    },
    #[error(transparent)]
    Issuance(#[from] IssuanceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

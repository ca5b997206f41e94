use super::common::*;
use crate::workflows::residency::requests::audit::{AuditAction, AuditDecision, AuditQuery};
use crate::workflows::residency::requests::domain::{
    Actor, EntityId, EntityKind, MaintenanceCategory, MaintenancePriority, RequestDetails,
    RequestStatus, RequestSubmission, StaffDecision, StaffRole,
};
use crate::workflows::residency::requests::intake::ValidationError;
use crate::workflows::residency::requests::passes::{PassApproval, PassStatus};
use crate::workflows::residency::requests::policy::PolicyConfig;
use crate::workflows::residency::requests::repository::{Recipient, RequestEventKind};
use crate::workflows::residency::requests::service::{
    AuthorizationError, DecisionInput, RequestService, RequestServiceError,
};
use crate::workflows::residency::ConflictKind;

use chrono::{Duration, Utc};
use std::sync::Arc;

fn approve_input(staff: &str) -> DecisionInput {
    DecisionInput {
        staff_id: EntityId::new(staff),
        decision: StaffDecision::Approve,
        reason: None,
    }
}

fn reject_input(staff: &str, reason: Option<&str>) -> DecisionInput {
    DecisionInput {
        staff_id: EntityId::new(staff),
        decision: StaffDecision::Reject,
        reason: reason.map(str::to_string),
    }
}

#[test]
fn submit_auto_approves_short_guest_visits() {
    let (service, store, notifier) = seeded_service();

    let record = service
        .submit(EntityId::new("stu-001"), guest_submission(1))
        .expect("clean one-night visit auto-approves");

    assert_eq!(record.request.status, RequestStatus::Approved);
    assert!(record.request.auto_approved);
    assert!(record.request.approved_by.is_none());
    assert!(record.decided_at.is_some());
    assert_eq!(
        record.request.approval_reason.as_deref(),
        Some("Auto-approved: 1-night guest visit with a clean student record")
    );

    let audit = store.audit_log();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::GuestApproval);
    assert_eq!(audit[0].decision, AuditDecision::Approved);
    assert_eq!(audit[0].actor, Actor::System);
    assert_eq!(audit[0].confidence, 1.0);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RequestEventKind::Approved);
    assert_eq!(
        events[0].recipient,
        Recipient::Student {
            id: EntityId::new("stu-001")
        }
    );

    // Guest visits never carry passes.
    assert!(service
        .pass_for_request(&record.request.id)
        .expect("lookup succeeds")
        .is_none());
}

#[test]
fn submit_escalates_long_guest_visits_to_the_warden() {
    let (service, store, notifier) = seeded_service();

    let record = service
        .submit(EntityId::new("stu-001"), guest_submission(3))
        .expect("escalation still persists the request");

    assert_eq!(record.request.status, RequestStatus::Pending);
    assert!(!record.request.auto_approved);
    assert!(record.decided_at.is_none());
    let route = record
        .evaluation
        .as_ref()
        .and_then(|evaluation| evaluation.route)
        .expect("escalations carry a route");
    assert_eq!(route.assignee, StaffRole::Warden);

    let audit = store.audit_log();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].decision, AuditDecision::Escalated);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RequestEventKind::Escalated);
    assert_eq!(
        events[0].recipient,
        Recipient::StaffQueue {
            role: StaffRole::Warden
        }
    );
}

#[test]
fn submit_escalates_guests_of_students_with_violations() {
    let (service, _, notifier) = seeded_service();

    let record = service
        .submit(EntityId::new("stu-002"), guest_submission(1))
        .expect("marked student escalates");

    assert_eq!(record.request.status, RequestStatus::Pending);
    assert_eq!(notifier.events()[0].kind, RequestEventKind::Escalated);
}

#[test]
fn submit_refuses_unknown_students() {
    let (service, store, _) = seeded_service();

    match service.submit(EntityId::new("stu-ghost"), guest_submission(1)) {
        Err(RequestServiceError::NotFound { kind, id }) => {
            assert_eq!(kind, EntityKind::Student);
            assert_eq!(id, EntityId::new("stu-ghost"));
        }
        other => panic!("expected not-found error, got {other:?}"),
    }
    assert_eq!(store.record_count(), 0);
}

#[test]
fn malformed_submissions_are_never_persisted() {
    let (service, store, notifier) = seeded_service();

    let mut submission = guest_submission(1);
    if let RequestSubmission::Guest(guest) = &mut submission {
        guest.guest_name = "   ".to_string();
    }

    match service.submit(EntityId::new("stu-001"), submission) {
        Err(RequestServiceError::Validation(ValidationError::MissingField {
            field: "guest name",
        })) => {}
        other => panic!("expected missing-field error, got {other:?}"),
    }

    assert_eq!(store.record_count(), 0);
    assert!(store.audit_log().is_empty());
    assert!(notifier.events().is_empty());
}

#[test]
fn overlong_leave_fails_intake_before_any_record_exists() {
    let (service, store, _) = seeded_service();

    match service.submit(EntityId::new("stu-001"), leave_submission(31)) {
        Err(RequestServiceError::Validation(ValidationError::LeaveTooLong {
            requested: 31,
            max: 30,
        })) => {}
        other => panic!("expected leave-too-long error, got {other:?}"),
    }
    assert_eq!(store.record_count(), 0);
}

#[test]
fn auto_approved_leave_issues_a_pass_in_the_same_commit() {
    let (service, store, notifier) = seeded_service();

    let record = service
        .submit(EntityId::new("stu-001"), leave_submission(2))
        .expect("two-day leave auto-approves");

    assert_eq!(record.request.status, RequestStatus::Approved);
    let pass = service
        .pass_for_request(&record.request.id)
        .expect("lookup succeeds")
        .expect("approved leave carries a pass");

    let RequestDetails::Leave(span) = &record.request.details else {
        panic!("expected leave details");
    };
    assert_eq!(pass.from_date, span.from_date);
    assert_eq!(pass.to_date, span.to_date);
    assert_eq!(pass.total_days, 2);
    assert_eq!(pass.approval, PassApproval::Auto);
    assert_eq!(pass.status, PassStatus::Active);

    let audit = store.audit_log();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].action, AuditAction::LeaveApproval);
    assert_eq!(audit[1].action, AuditAction::PassGeneration);
    assert_eq!(audit[1].entity_kind, EntityKind::Pass);
    assert_eq!(audit[1].entity_id, pass.id);
    assert!(audit[1].reasoning.contains(&pass.pass_number));

    assert_eq!(notifier.events()[0].kind, RequestEventKind::Approved);
}

#[test]
fn emergency_maintenance_schedules_today_and_alerts_staff() {
    let (service, _, notifier) = seeded_service();

    let record = service
        .submit(
            EntityId::new("stu-001"),
            maintenance_submission(MaintenanceCategory::Plumbing, MaintenancePriority::Emergency),
        )
        .expect("emergency work order auto-approves");

    assert_eq!(record.request.status, RequestStatus::Approved);
    let RequestDetails::Maintenance(issue) = &record.request.details else {
        panic!("expected maintenance details");
    };
    assert_eq!(issue.scheduled_for, Some(Utc::now().date_naive()));

    let events = notifier.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, RequestEventKind::Approved);
    assert_eq!(events[1].kind, RequestEventKind::UrgentAlert);
    assert_eq!(
        events[1].recipient,
        Recipient::StaffQueue {
            role: StaffRole::Maintenance
        }
    );
    assert_eq!(events[1].summary, "Emergency plumbing reported in room B-104");
}

#[test]
fn basic_maintenance_schedules_for_the_next_day() {
    let (service, _, notifier) = seeded_service();

    let record = service
        .submit(
            EntityId::new("stu-001"),
            maintenance_submission(MaintenanceCategory::Cleaning, MaintenancePriority::Low),
        )
        .expect("basic work order auto-approves");

    assert_eq!(record.request.status, RequestStatus::Approved);
    let RequestDetails::Maintenance(issue) = &record.request.details else {
        panic!("expected maintenance details");
    };
    assert_eq!(
        issue.scheduled_for,
        Some(Utc::now().date_naive() + Duration::days(1))
    );
    assert_eq!(notifier.events().len(), 1, "no urgent alert for low priority");
}

#[test]
fn complex_maintenance_escalates_to_the_maintenance_queue() {
    let (service, _, notifier) = seeded_service();

    let record = service
        .submit(
            EntityId::new("stu-001"),
            maintenance_submission(MaintenanceCategory::Structural, MaintenancePriority::High),
        )
        .expect("complex work order escalates");

    assert_eq!(record.request.status, RequestStatus::Pending);
    assert_eq!(
        notifier.events()[0].recipient,
        Recipient::StaffQueue {
            role: StaffRole::Maintenance
        }
    );
}

#[test]
fn tightened_policy_rejections_persist_with_reasoning() {
    // A zero-day cap cannot be enforced at intake (the guard sanitizes it
    // to the default), so the evaluator's reject verdict reaches the
    // lifecycle here.
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    store.add_student(student("001", 0));
    let config = PolicyConfig {
        max_leave_days: 0,
        ..PolicyConfig::standard()
    };
    let service = RequestService::with_policy(store.clone(), notifier.clone(), config);

    let record = service
        .submit(EntityId::new("stu-001"), leave_submission(2))
        .expect("rejections persist rather than erroring");

    assert_eq!(record.request.status, RequestStatus::Rejected);
    assert!(record.decided_at.is_some());
    assert_eq!(
        record.request.approval_reason.as_deref(),
        Some("Rejected: leave of 2 days exceeds the 0-day maximum")
    );

    let audit = store.audit_log();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].decision, AuditDecision::Rejected);

    let events = notifier.events();
    assert_eq!(events[0].kind, RequestEventKind::Rejected);
    assert!(service
        .pass_for_request(&record.request.id)
        .expect("lookup succeeds")
        .is_none());
}

#[test]
fn staff_approval_issues_the_pass_and_defaults_the_reason() {
    let (service, store, notifier) = seeded_service();

    let pending = service
        .submit(EntityId::new("stu-001"), leave_submission(5))
        .expect("five-day leave escalates");
    assert_eq!(pending.request.status, RequestStatus::Pending);

    let decided = service
        .staff_decide(&pending.request.id, approve_input("staff-warden"))
        .expect("warden approves the leave");

    assert_eq!(decided.request.status, RequestStatus::Approved);
    assert!(!decided.request.auto_approved);
    assert_eq!(
        decided.request.approved_by,
        Some(EntityId::new("staff-warden"))
    );
    assert_eq!(
        decided.request.approval_reason.as_deref(),
        Some("Approved by staff")
    );

    let pass = service
        .pass_for_request(&decided.request.id)
        .expect("lookup succeeds")
        .expect("approved leave carries a pass");
    assert_eq!(
        pass.approval,
        PassApproval::Manual {
            staff_id: EntityId::new("staff-warden")
        }
    );

    let audit = store.audit_log();
    assert_eq!(audit.len(), 3);
    assert_eq!(audit[0].decision, AuditDecision::Escalated);
    assert_eq!(audit[1].decision, AuditDecision::Approved);
    assert_eq!(audit[1].actor, Actor::Staff(EntityId::new("staff-warden")));
    assert_eq!(audit[1].confidence, 0.9);
    assert_eq!(audit[1].rules_applied, vec!["staff_decision"]);
    assert_eq!(audit[2].action, AuditAction::PassGeneration);

    let events = notifier.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].kind, RequestEventKind::Approved);
}

#[test]
fn staff_rejection_requires_a_reason() {
    let (service, _, _) = seeded_service();

    let pending = service
        .submit(EntityId::new("stu-001"), leave_submission(5))
        .expect("five-day leave escalates");

    for reason in [None, Some("   ")] {
        match service.staff_decide(&pending.request.id, reject_input("staff-warden", reason)) {
            Err(RequestServiceError::Validation(ValidationError::MissingRejectionReason)) => {}
            other => panic!("expected missing-reason error, got {other:?}"),
        }
    }

    let unchanged = service
        .request(&pending.request.id)
        .expect("request still present");
    assert_eq!(unchanged.request.status, RequestStatus::Pending);
}

#[test]
fn staff_rejection_records_the_trimmed_reason() {
    let (service, _, notifier) = seeded_service();

    let pending = service
        .submit(EntityId::new("stu-001"), leave_submission(5))
        .expect("five-day leave escalates");

    let decided = service
        .staff_decide(
            &pending.request.id,
            reject_input("staff-warden", Some("  exams in progress  ")),
        )
        .expect("warden rejects with a reason");

    assert_eq!(decided.request.status, RequestStatus::Rejected);
    assert_eq!(
        decided.request.approval_reason.as_deref(),
        Some("exams in progress")
    );
    assert_eq!(notifier.events()[1].kind, RequestEventKind::Rejected);
    assert_eq!(notifier.events()[1].summary, "exams in progress");
}

#[test]
fn role_matrix_gates_staff_decisions() {
    let (service, _, _) = seeded_service();

    let pending = service
        .submit(EntityId::new("stu-001"), guest_submission(3))
        .expect("long guest visit escalates");

    match service.staff_decide(&pending.request.id, approve_input("staff-maint")) {
        Err(RequestServiceError::Authorization(AuthorizationError::RoleMismatch {
            role, ..
        })) => assert_eq!(role, StaffRole::Maintenance),
        other => panic!("expected role mismatch, got {other:?}"),
    }
    match service.staff_decide(&pending.request.id, approve_input("staff-security")) {
        Err(RequestServiceError::Authorization(AuthorizationError::RoleMismatch { .. })) => {}
        other => panic!("expected role mismatch, got {other:?}"),
    }

    // Admin may decide anything.
    let decided = service
        .staff_decide(&pending.request.id, approve_input("staff-admin"))
        .expect("admin approves the guest visit");
    assert_eq!(decided.request.status, RequestStatus::Approved);
}

#[test]
fn deactivated_staff_cannot_decide() {
    let (service, _, _) = seeded_service();

    let pending = service
        .submit(EntityId::new("stu-001"), leave_submission(5))
        .expect("five-day leave escalates");

    match service.staff_decide(&pending.request.id, approve_input("staff-dormant")) {
        Err(RequestServiceError::Authorization(AuthorizationError::InactiveStaff {
            staff_id,
        })) => assert_eq!(staff_id, EntityId::new("staff-dormant")),
        other => panic!("expected inactive-staff error, got {other:?}"),
    }
}

#[test]
fn students_cannot_decide_requests() {
    let (service, _, _) = seeded_service();

    let pending = service
        .submit(EntityId::new("stu-001"), leave_submission(5))
        .expect("five-day leave escalates");

    // The requesting student approving their own leave.
    match service.staff_decide(&pending.request.id, approve_input("stu-001")) {
        Err(RequestServiceError::Authorization(AuthorizationError::NotStaff { actor_id })) => {
            assert_eq!(actor_id, EntityId::new("stu-001"))
        }
        other => panic!("expected non-staff refusal, got {other:?}"),
    }

    let untouched = service
        .request(&pending.request.id)
        .expect("request persisted");
    assert_eq!(untouched.request.status, RequestStatus::Pending);
}

#[test]
fn unknown_requests_and_staff_are_not_found() {
    let (service, _, _) = seeded_service();

    match service.staff_decide(&EntityId::new("req-ghost"), approve_input("staff-warden")) {
        Err(RequestServiceError::NotFound { kind, .. }) => assert_eq!(kind, EntityKind::Request),
        other => panic!("expected missing request, got {other:?}"),
    }

    let pending = service
        .submit(EntityId::new("stu-001"), leave_submission(5))
        .expect("five-day leave escalates");
    match service.staff_decide(&pending.request.id, approve_input("staff-ghost")) {
        Err(RequestServiceError::NotFound { kind, .. }) => assert_eq!(kind, EntityKind::Staff),
        other => panic!("expected missing staff, got {other:?}"),
    }
}

#[test]
fn deciding_a_settled_request_is_a_state_conflict() {
    let (service, _, _) = seeded_service();

    let record = service
        .submit(EntityId::new("stu-001"), guest_submission(1))
        .expect("clean one-night visit auto-approves");

    match service.staff_decide(&record.request.id, reject_input("staff-warden", Some("no"))) {
        Err(RequestServiceError::StateConflict { status, .. }) => {
            assert_eq!(status, RequestStatus::Approved);
        }
        other => panic!("expected state conflict, got {other:?}"),
    }
}

#[test]
fn losing_a_decision_race_reports_the_winning_status() {
    let (service, store, _) = seeded_service();

    let pending = service
        .submit(EntityId::new("stu-001"), leave_submission(5))
        .expect("five-day leave escalates");

    store.race_next_commit(RequestStatus::Rejected);

    match service.staff_decide(&pending.request.id, approve_input("staff-warden")) {
        Err(RequestServiceError::StateConflict { request_id, status }) => {
            assert_eq!(request_id, pending.request.id);
            assert_eq!(status, RequestStatus::Rejected);
        }
        other => panic!("expected state conflict from the race, got {other:?}"),
    }

    // The loser's pass never lands.
    assert!(service
        .pass_for_request(&pending.request.id)
        .expect("lookup succeeds")
        .is_none());
}

#[test]
fn verify_pass_confirms_valid_passes_and_audits_the_check() {
    let (service, store, _) = seeded_service();

    let record = service
        .submit(EntityId::new("stu-001"), leave_submission_starting(0, 2))
        .expect("leave starting today auto-approves");
    let pass = service
        .pass_for_request(&record.request.id)
        .expect("lookup succeeds")
        .expect("approved leave carries a pass");

    let actor = Actor::Staff(EntityId::new("staff-security"));
    let verification = service
        .verify_pass(&pass.pass_number, actor.clone())
        .expect("verification succeeds");

    assert!(verification.valid);
    assert_eq!(verification.message, "Pass is valid");
    assert_eq!(verification.student_name.as_deref(), Some("Student 001"));

    let audit = store.audit_log();
    let entry = audit.last().expect("verification is audited");
    assert_eq!(entry.action, AuditAction::PassVerification);
    assert_eq!(entry.entity_id, EntityId::new(pass.pass_number.clone()));
    assert_eq!(entry.actor, actor);
}

#[test]
fn verify_pass_reports_unknown_numbers_without_erroring() {
    let (service, store, _) = seeded_service();

    let verification = service
        .verify_pass("LP-00000000-0000", Actor::System)
        .expect("unknown numbers are a negative result, not an error");

    assert!(!verification.valid);
    assert_eq!(verification.message, "No pass found with this number");

    let audit = store.audit_log();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].decision, AuditDecision::Processed);
    assert_eq!(audit[0].reasoning, "No pass found with this number");
}

#[test]
fn expire_overdue_sweeps_requests_and_passes_idempotently() {
    let (service, store, _) = seeded_service();

    let request = pending_request(
        "exp-1",
        &EntityId::new("stu-001"),
        leave_details(date(2026, 3, 12), date(2026, 3, 15)),
    );
    let pass = pass_for(&request, "LP-20260310-1101");
    store.add_record(approved_record(request));
    store.add_pass(pass.clone());

    let sweep = service
        .expire_overdue(date(2026, 3, 20))
        .expect("sweep succeeds");

    assert_eq!(sweep.expired_requests, vec![EntityId::new("req-exp-1")]);
    assert_eq!(sweep.expired_passes, vec![pass.id.clone()]);

    let record = service
        .request(&EntityId::new("req-exp-1"))
        .expect("record still present");
    assert_eq!(record.request.status, RequestStatus::Expired);

    let audit = store.audit_log();
    assert_eq!(audit.len(), 2);
    assert!(audit
        .iter()
        .all(|entry| entry.action == AuditAction::SystemAction));

    let second = service
        .expire_overdue(date(2026, 3, 20))
        .expect("second sweep succeeds");
    assert!(second.is_empty());
    assert_eq!(store.audit_log().len(), 2, "idempotent sweeps audit once");
}

#[test]
fn expire_overdue_leaves_current_windows_alone() {
    let (service, store, _) = seeded_service();

    let request = pending_request(
        "exp-2",
        &EntityId::new("stu-001"),
        leave_details(date(2026, 3, 12), date(2026, 3, 15)),
    );
    store.add_record(approved_record(request));

    // The window end is inclusive: the request survives its last day.
    let sweep = service
        .expire_overdue(date(2026, 3, 15))
        .expect("sweep succeeds");
    assert!(sweep.is_empty());
}

#[test]
fn expire_overdue_skips_records_claimed_by_a_racing_writer() {
    let (service, store, _) = seeded_service();

    let request = pending_request(
        "exp-3",
        &EntityId::new("stu-001"),
        leave_details(date(2026, 3, 12), date(2026, 3, 15)),
    );
    let pass = pass_for(&request, "LP-20260310-1102");
    store.add_record(approved_record(request));
    store.add_pass(pass.clone());

    store.race_next_commit(RequestStatus::Rejected);

    let sweep = service
        .expire_overdue(date(2026, 3, 20))
        .expect("sweep tolerates the race");

    assert!(sweep.expired_requests.is_empty());
    assert_eq!(sweep.expired_passes, vec![pass.id]);
}

#[test]
fn nightly_check_reports_conflicts_and_audits_the_run() {
    let (service, store, _) = seeded_service();

    // An active pass backed by a still-pending request is an orphan.
    let request = pending_request(
        "orphan",
        &EntityId::new("stu-001"),
        leave_details(date(2026, 3, 12), date(2026, 3, 15)),
    );
    let pass = pass_for(&request, "LP-20260310-1103");
    store.add_record(pending_record(request));
    store.add_pass(pass);

    let first = service
        .run_nightly_check(date(2026, 3, 13))
        .expect("check succeeds");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, ConflictKind::OrphanedPass);

    let second = service
        .run_nightly_check(date(2026, 3, 13))
        .expect("check succeeds");
    assert_eq!(first, second, "unchanged data yields the identical list");

    let audit = store.audit_log();
    assert_eq!(audit.len(), 2, "each run that finds conflicts is audited");
    assert_eq!(audit[0].action, AuditAction::ConflictDetection);
    assert_eq!(audit[0].entity_kind, EntityKind::System);
    assert_eq!(audit[0].entity_id, EntityId::new("nightly-2026-03-13"));
    assert_eq!(audit[0].rules_applied, vec!["orphaned_pass"]);
}

#[test]
fn nightly_check_stays_silent_on_a_clean_store() {
    let (service, store, _) = seeded_service();

    let conflicts = service
        .run_nightly_check(date(2026, 3, 13))
        .expect("check succeeds");

    assert!(conflicts.is_empty());
    assert!(store.audit_log().is_empty(), "clean runs are not audited");
}

#[test]
fn pass_history_returns_newest_first_and_validates_the_student() {
    let (service, _, _) = seeded_service();

    let first = service
        .submit(EntityId::new("stu-001"), leave_submission_starting(7, 2))
        .expect("first leave auto-approves");
    let second = service
        .submit(EntityId::new("stu-001"), leave_submission_starting(14, 2))
        .expect("second leave auto-approves");

    let history = service
        .pass_history(&EntityId::new("stu-001"), None)
        .expect("history succeeds");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].request_id, second.request.id);
    assert_eq!(history[1].request_id, first.request.id);

    let active = service
        .pass_history(&EntityId::new("stu-001"), Some(PassStatus::Active))
        .expect("filtered history succeeds");
    assert_eq!(active.len(), 2);
    let expired = service
        .pass_history(&EntityId::new("stu-001"), Some(PassStatus::Expired))
        .expect("filtered history succeeds");
    assert!(expired.is_empty());

    match service.pass_history(&EntityId::new("stu-ghost"), None) {
        Err(RequestServiceError::NotFound { kind, .. }) => assert_eq!(kind, EntityKind::Student),
        other => panic!("expected missing student, got {other:?}"),
    }
}

#[test]
fn audit_trail_filters_by_entity() {
    let (service, _, _) = seeded_service();

    let first = service
        .submit(EntityId::new("stu-001"), guest_submission(1))
        .expect("first visit auto-approves");
    service
        .submit(EntityId::new("stu-001"), guest_submission(3))
        .expect("second visit escalates");

    let trail = service
        .audit_trail(&AuditQuery::for_entity(first.request.id.clone()))
        .expect("trail query succeeds");
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].entity_id, first.request.id);
}

#[test]
fn notification_failures_never_fail_the_operation() {
    let store = Arc::new(MemoryStore::default());
    store.add_student(student("001", 0));
    let service = RequestService::new(store.clone(), Arc::new(FailingNotifier));

    let record = service
        .submit(EntityId::new("stu-001"), guest_submission(1))
        .expect("a dead channel does not block approval");

    assert_eq!(record.request.status, RequestStatus::Approved);
    assert_eq!(store.audit_log().len(), 1, "audit still lands");
}

#[test]
fn morning_report_reflects_store_state() {
    let (service, _, _) = seeded_service();

    service
        .submit(
            EntityId::new("stu-001"),
            maintenance_submission(MaintenanceCategory::Structural, MaintenancePriority::High),
        )
        .expect("complex work order escalates");

    let report = service
        .morning_report(Utc::now().date_naive())
        .expect("report compiles");

    assert_eq!(report.pending_requests, 1);
    assert_eq!(report.open_maintenance.len(), 1);
    assert!(report.urgent_maintenance.is_empty());
}

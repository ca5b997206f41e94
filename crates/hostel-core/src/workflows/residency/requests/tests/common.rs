use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::residency::requests::audit::{AuditEntry, AuditQuery};
use crate::workflows::residency::requests::domain::{
    EntityId, GuestSubmission, GuestVisit, LeaveSpan, LeaveSubmission, MaintenanceCategory,
    MaintenanceIssue, MaintenancePriority, MaintenanceSubmission, Request, RequestDetails,
    RequestStatus, RequestSubmission, StaffMember, StaffRole, Student,
};
use crate::workflows::residency::requests::passes::{
    DigitalPass, PassApproval, PassQuery, PassStatus,
};
use crate::workflows::residency::requests::repository::{
    NotificationChannel, NotifyError, RequestEvent, RequestRecord, RequestStore, StoreError,
};
use crate::workflows::residency::requests::router::request_router;
use crate::workflows::residency::requests::service::RequestService;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn student(suffix: &str, violation_count: u32) -> Student {
    Student {
        id: EntityId(format!("stu-{suffix}")),
        name: format!("Student {suffix}"),
        room_number: format!("R-{suffix}"),
        block: "A".to_string(),
        violation_count,
        created_at: Utc::now() - Duration::days(30),
    }
}

pub(super) fn student_in_room(suffix: &str, room: &str) -> Student {
    let mut student = student(suffix, 0);
    student.room_number = room.to_string();
    student
}

pub(super) fn staff(suffix: &str, role: StaffRole) -> StaffMember {
    StaffMember {
        id: EntityId(format!("staff-{suffix}")),
        name: format!("Staff {suffix}"),
        role,
        active: true,
    }
}

pub(super) fn guest_submission(nights: i64) -> RequestSubmission {
    let arrival = Utc::now() + Duration::hours(48);
    RequestSubmission::Guest(GuestSubmission {
        guest_name: "Rohan Mehta".to_string(),
        relationship: Some("brother".to_string()),
        arrival,
        departure: arrival + Duration::days(nights),
        purpose: Some("family visit".to_string()),
    })
}

pub(super) fn leave_submission(total_days: i64) -> RequestSubmission {
    leave_submission_starting(7, total_days)
}

pub(super) fn leave_submission_starting(offset_days: i64, total_days: i64) -> RequestSubmission {
    let from = Utc::now().date_naive() + Duration::days(offset_days);
    RequestSubmission::Leave(LeaveSubmission {
        from_date: from,
        to_date: from + Duration::days(total_days - 1),
        reason: "family function".to_string(),
        emergency_contact: Some("+91 9876500000".to_string()),
    })
}

pub(super) fn maintenance_submission(
    category: MaintenanceCategory,
    priority: MaintenancePriority,
) -> RequestSubmission {
    RequestSubmission::Maintenance(MaintenanceSubmission {
        room_number: "B-104".to_string(),
        category,
        description: "leaking tap under the basin".to_string(),
        priority,
    })
}

pub(super) fn guest_details(arrival: DateTime<Utc>, departure: DateTime<Utc>) -> RequestDetails {
    RequestDetails::Guest(GuestVisit {
        guest_name: "Asha Rao".to_string(),
        relationship: None,
        arrival,
        departure,
        purpose: None,
    })
}

pub(super) fn leave_details(from: NaiveDate, to: NaiveDate) -> RequestDetails {
    RequestDetails::Leave(LeaveSpan {
        from_date: from,
        to_date: to,
        reason: "exam leave".to_string(),
        emergency_contact: None,
    })
}

pub(super) fn maintenance_details(
    room: &str,
    category: MaintenanceCategory,
    priority: MaintenancePriority,
) -> RequestDetails {
    RequestDetails::Maintenance(MaintenanceIssue {
        room_number: room.to_string(),
        category,
        description: "needs attention".to_string(),
        priority,
        scheduled_for: None,
    })
}

pub(super) fn pending_request(
    suffix: &str,
    student_id: &EntityId,
    details: RequestDetails,
) -> Request {
    Request {
        id: EntityId(format!("req-{suffix}")),
        student_id: student_id.clone(),
        details,
        status: RequestStatus::Pending,
        auto_approved: false,
        approval_reason: None,
        approved_by: None,
        created_at: fixed_now() - Duration::hours(6),
    }
}

pub(super) fn approved_record(mut request: Request) -> RequestRecord {
    request.status = RequestStatus::Approved;
    RequestRecord {
        request,
        evaluation: None,
        decided_at: Some(fixed_now() - Duration::hours(5)),
    }
}

pub(super) fn pending_record(request: Request) -> RequestRecord {
    RequestRecord {
        request,
        evaluation: None,
        decided_at: None,
    }
}

/// Pass mirroring a leave request's window, for checker and query tests.
pub(super) fn pass_for(request: &Request, number: &str) -> DigitalPass {
    let RequestDetails::Leave(span) = &request.details else {
        panic!("pass fixtures need a leave request");
    };
    DigitalPass {
        id: EntityId(format!("pass-{number}")),
        pass_number: number.to_string(),
        verification_code: "ABC123".to_string(),
        request_id: request.id.clone(),
        student_id: request.student_id.clone(),
        from_date: span.from_date,
        to_date: span.to_date,
        total_days: span.total_days(),
        reason: span.reason.clone(),
        approval: PassApproval::Auto,
        status: PassStatus::Active,
        issued_at: fixed_now() - Duration::hours(5),
    }
}

pub(super) fn build_service() -> (
    RequestService<MemoryStore, RecordingNotifier>,
    Arc<MemoryStore>,
    Arc<RecordingNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = RequestService::new(store.clone(), notifier.clone());
    (service, store, notifier)
}

/// Service over a store pre-seeded with the usual cast: a clean student,
/// a student with violations, and one staff member per role.
pub(super) fn seeded_service() -> (
    RequestService<MemoryStore, RecordingNotifier>,
    Arc<MemoryStore>,
    Arc<RecordingNotifier>,
) {
    let (service, store, notifier) = build_service();
    store.add_student(student("001", 0));
    store.add_student(student("002", 2));
    store.add_staff(staff("warden", StaffRole::Warden));
    store.add_staff(staff("maint", StaffRole::Maintenance));
    store.add_staff(staff("security", StaffRole::Security));
    store.add_staff(staff("admin", StaffRole::Admin));
    let mut dormant = staff("dormant", StaffRole::Warden);
    dormant.active = false;
    store.add_staff(dormant);
    (service, store, notifier)
}

pub(super) fn request_router_with_service(
    service: RequestService<MemoryStore, RecordingNotifier>,
) -> axum::Router {
    request_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryStore {
    students: Mutex<HashMap<EntityId, Student>>,
    staff: Mutex<HashMap<EntityId, StaffMember>>,
    records: Mutex<Vec<RequestRecord>>,
    passes: Mutex<Vec<DigitalPass>>,
    audit: Mutex<Vec<AuditEntry>>,
    race: Mutex<Option<RequestStatus>>,
}

impl MemoryStore {
    pub(super) fn add_student(&self, student: Student) {
        self.students
            .lock()
            .expect("student mutex poisoned")
            .insert(student.id.clone(), student);
    }

    pub(super) fn add_staff(&self, member: StaffMember) {
        self.staff
            .lock()
            .expect("staff mutex poisoned")
            .insert(member.id.clone(), member);
    }

    pub(super) fn add_record(&self, record: RequestRecord) {
        self.records
            .lock()
            .expect("record mutex poisoned")
            .push(record);
    }

    pub(super) fn add_pass(&self, pass: DigitalPass) {
        self.passes.lock().expect("pass mutex poisoned").push(pass);
    }

    pub(super) fn record_count(&self) -> usize {
        self.records.lock().expect("record mutex poisoned").len()
    }

    pub(super) fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit.lock().expect("audit mutex poisoned").clone()
    }

    /// Stage a racing writer: the next `commit_decision` call will find
    /// the stored request already moved to `status`.
    pub(super) fn race_next_commit(&self, status: RequestStatus) {
        *self.race.lock().expect("race mutex poisoned") = Some(status);
    }
}

impl RequestStore for MemoryStore {
    fn student(&self, id: &EntityId) -> Result<Option<Student>, StoreError> {
        Ok(self
            .students
            .lock()
            .expect("student mutex poisoned")
            .get(id)
            .cloned())
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        let mut all: Vec<Student> = self
            .students
            .lock()
            .expect("student mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(all)
    }

    fn staff_member(&self, id: &EntityId) -> Result<Option<StaffMember>, StoreError> {
        Ok(self
            .staff
            .lock()
            .expect("staff mutex poisoned")
            .get(id)
            .cloned())
    }

    fn insert_request(&self, record: RequestRecord) -> Result<RequestRecord, StoreError> {
        let mut records = self.records.lock().expect("record mutex poisoned");
        if records
            .iter()
            .any(|stored| stored.request.id == record.request.id)
        {
            return Err(StoreError::Duplicate);
        }
        records.push(record.clone());
        Ok(record)
    }

    fn request(&self, id: &EntityId) -> Result<Option<RequestRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("record mutex poisoned")
            .iter()
            .find(|record| &record.request.id == id)
            .cloned())
    }

    fn requests(&self) -> Result<Vec<RequestRecord>, StoreError> {
        Ok(self.records.lock().expect("record mutex poisoned").clone())
    }

    fn pending_requests(&self, limit: usize) -> Result<Vec<RequestRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("record mutex poisoned")
            .iter()
            .filter(|record| record.request.status.is_pending())
            .take(limit)
            .cloned()
            .collect())
    }

    fn commit_decision(
        &self,
        record: RequestRecord,
        expected: RequestStatus,
        pass: Option<DigitalPass>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("record mutex poisoned");

        if let Some(status) = self.race.lock().expect("race mutex poisoned").take() {
            if let Some(stored) = records
                .iter_mut()
                .find(|stored| stored.request.id == record.request.id)
            {
                stored.request.status = status;
            }
        }

        let Some(stored) = records
            .iter_mut()
            .find(|stored| stored.request.id == record.request.id)
        else {
            return Err(StoreError::NotFound);
        };
        if stored.request.status != expected {
            return Err(StoreError::StaleStatus);
        }

        if let Some(pass) = pass {
            let mut passes = self.passes.lock().expect("pass mutex poisoned");
            if passes
                .iter()
                .any(|existing| existing.pass_number == pass.pass_number)
            {
                return Err(StoreError::Duplicate);
            }
            passes.push(pass);
        }

        *stored = record;
        Ok(())
    }

    fn pass(&self, id: &EntityId) -> Result<Option<DigitalPass>, StoreError> {
        Ok(self
            .passes
            .lock()
            .expect("pass mutex poisoned")
            .iter()
            .find(|pass| &pass.id == id)
            .cloned())
    }

    fn pass_by_number(&self, pass_number: &str) -> Result<Option<DigitalPass>, StoreError> {
        Ok(self
            .passes
            .lock()
            .expect("pass mutex poisoned")
            .iter()
            .find(|pass| pass.pass_number == pass_number)
            .cloned())
    }

    fn pass_for_request(&self, request_id: &EntityId) -> Result<Option<DigitalPass>, StoreError> {
        Ok(self
            .passes
            .lock()
            .expect("pass mutex poisoned")
            .iter()
            .find(|pass| &pass.request_id == request_id)
            .cloned())
    }

    fn passes(&self, query: &PassQuery) -> Result<Vec<DigitalPass>, StoreError> {
        Ok(self
            .passes
            .lock()
            .expect("pass mutex poisoned")
            .iter()
            .rev()
            .filter(|pass| query.matches(pass))
            .cloned()
            .collect())
    }

    fn update_pass_status(&self, id: &EntityId, status: PassStatus) -> Result<(), StoreError> {
        let mut passes = self.passes.lock().expect("pass mutex poisoned");
        let Some(pass) = passes.iter_mut().find(|pass| &pass.id == id) else {
            return Err(StoreError::NotFound);
        };
        pass.status = status;
        Ok(())
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.audit.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }

    fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self
            .audit
            .lock()
            .expect("audit mutex poisoned")
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    events: Mutex<Vec<RequestEvent>>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<RequestEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl NotificationChannel for RecordingNotifier {
    fn publish(&self, event: RequestEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl NotificationChannel for FailingNotifier {
    fn publish(&self, _event: RequestEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

pub(super) struct UnavailableStore;

impl RequestStore for UnavailableStore {
    fn student(&self, _id: &EntityId) -> Result<Option<Student>, StoreError> {
        offline()
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        offline()
    }

    fn staff_member(&self, _id: &EntityId) -> Result<Option<StaffMember>, StoreError> {
        offline()
    }

    fn insert_request(&self, _record: RequestRecord) -> Result<RequestRecord, StoreError> {
        offline()
    }

    fn request(&self, _id: &EntityId) -> Result<Option<RequestRecord>, StoreError> {
        offline()
    }

    fn requests(&self) -> Result<Vec<RequestRecord>, StoreError> {
        offline()
    }

    fn pending_requests(&self, _limit: usize) -> Result<Vec<RequestRecord>, StoreError> {
        offline()
    }

    fn commit_decision(
        &self,
        _record: RequestRecord,
        _expected: RequestStatus,
        _pass: Option<DigitalPass>,
    ) -> Result<(), StoreError> {
        offline()
    }

    fn pass(&self, _id: &EntityId) -> Result<Option<DigitalPass>, StoreError> {
        offline()
    }

    fn pass_by_number(&self, _pass_number: &str) -> Result<Option<DigitalPass>, StoreError> {
        offline()
    }

    fn pass_for_request(&self, _request_id: &EntityId) -> Result<Option<DigitalPass>, StoreError> {
        offline()
    }

    fn passes(&self, _query: &PassQuery) -> Result<Vec<DigitalPass>, StoreError> {
        offline()
    }

    fn update_pass_status(&self, _id: &EntityId, _status: PassStatus) -> Result<(), StoreError> {
        offline()
    }

    fn append_audit(&self, _entry: AuditEntry) -> Result<(), StoreError> {
        offline()
    }

    fn audit_entries(&self, _query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        offline()
    }
}

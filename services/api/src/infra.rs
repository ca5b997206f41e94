use chrono::{Duration, NaiveDate, Utc};
use hostel_core::workflows::residency::requests::domain::{
    EntityId, StaffMember, StaffRole, Student,
};
use hostel_core::workflows::residency::requests::repository::{
    NotificationChannel, NotifyError, RequestEvent, RequestRecord, RequestStore, StoreError,
};
use hostel_core::workflows::residency::requests::{
    AuditEntry, AuditQuery, DigitalPass, PassQuery, PassStatus, RequestService, RequestStatus,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store backing the service until the database adapter lands. Students and
/// staff are provisioned through `seed_directory`; everything else arrives
/// through the workflow.
#[derive(Default)]
pub(crate) struct InMemoryRequestStore {
    students: Mutex<HashMap<EntityId, Student>>,
    staff: Mutex<HashMap<EntityId, StaffMember>>,
    records: Mutex<Vec<RequestRecord>>,
    passes: Mutex<Vec<DigitalPass>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl InMemoryRequestStore {
    /// Provision the demo roster: three residents and the staff desk.
    pub(crate) fn seed_directory(&self) {
        let provisioned = Utc::now() - Duration::days(180);
        let students = [
            ("stu-101", "Priya Nair", "C-210", "C", 0),
            ("stu-102", "Arjun Shah", "B-104", "B", 2),
            ("stu-103", "Meera Pillai", "A-012", "A", 0),
        ];
        let mut guard = self.students.lock().expect("student mutex poisoned");
        for (id, name, room, block, violations) in students {
            guard.insert(
                EntityId::new(id),
                Student {
                    id: EntityId::new(id),
                    name: name.to_string(),
                    room_number: room.to_string(),
                    block: block.to_string(),
                    violation_count: violations,
                    created_at: provisioned,
                },
            );
        }
        drop(guard);

        let staff = [
            ("staff-warden", "Warden Kulkarni", StaffRole::Warden),
            ("staff-maintenance", "Facilities Desk", StaffRole::Maintenance),
            ("staff-security", "Gate Security", StaffRole::Security),
            ("staff-admin", "Hostel Office", StaffRole::Admin),
        ];
        let mut guard = self.staff.lock().expect("staff mutex poisoned");
        for (id, name, role) in staff {
            guard.insert(
                EntityId::new(id),
                StaffMember {
                    id: EntityId::new(id),
                    name: name.to_string(),
                    role,
                    active: true,
                },
            );
        }
    }
}

impl RequestStore for InMemoryRequestStore {
    fn student(&self, id: &EntityId) -> Result<Option<Student>, StoreError> {
        let guard = self.students.lock().expect("student mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn students(&self) -> Result<Vec<Student>, StoreError> {
        let guard = self.students.lock().expect("student mutex poisoned");
        let mut students: Vec<_> = guard.values().cloned().collect();
        students.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(students)
    }

    fn staff_member(&self, id: &EntityId) -> Result<Option<StaffMember>, StoreError> {
        let guard = self.staff.lock().expect("staff mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_request(&self, record: RequestRecord) -> Result<RequestRecord, StoreError> {
        let mut guard = self.records.lock().expect("record mutex poisoned");
        if guard
            .iter()
            .any(|stored| stored.request.id == record.request.id)
        {
            return Err(StoreError::Duplicate);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn request(&self, id: &EntityId) -> Result<Option<RequestRecord>, StoreError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard.iter().find(|stored| &stored.request.id == id).cloned())
    }

    fn requests(&self) -> Result<Vec<RequestRecord>, StoreError> {
        Ok(self.records.lock().expect("record mutex poisoned").clone())
    }

    fn pending_requests(&self, limit: usize) -> Result<Vec<RequestRecord>, StoreError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard
            .iter()
            .filter(|stored| stored.request.status.is_pending())
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
        let mut guard = self.records.lock().expect("record mutex poisoned");
        let stored = guard
            .iter_mut()
            .find(|stored| stored.request.id == record.request.id)
            .ok_or(StoreError::NotFound)?;
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
        let guard = self.passes.lock().expect("pass mutex poisoned");
        Ok(guard.iter().find(|pass| &pass.id == id).cloned())
    }

    fn pass_by_number(&self, pass_number: &str) -> Result<Option<DigitalPass>, StoreError> {
        let guard = self.passes.lock().expect("pass mutex poisoned");
        Ok(guard
            .iter()
            .find(|pass| pass.pass_number == pass_number)
            .cloned())
    }

    fn pass_for_request(&self, request_id: &EntityId) -> Result<Option<DigitalPass>, StoreError> {
        let guard = self.passes.lock().expect("pass mutex poisoned");
        Ok(guard
            .iter()
            .find(|pass| &pass.request_id == request_id)
            .cloned())
    }

    fn passes(&self, query: &PassQuery) -> Result<Vec<DigitalPass>, StoreError> {
        let guard = self.passes.lock().expect("pass mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .filter(|pass| query.matches(pass))
            .cloned()
            .collect())
    }

    fn update_pass_status(&self, id: &EntityId, status: PassStatus) -> Result<(), StoreError> {
        let mut guard = self.passes.lock().expect("pass mutex poisoned");
        let pass = guard
            .iter_mut()
            .find(|pass| &pass.id == id)
            .ok_or(StoreError::NotFound)?;
        pass.status = status;
        Ok(())
    }

    fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.audit.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }

    fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let guard = self.audit.lock().expect("audit mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect())
    }
}

/// Records decision notifications instead of delivering them; the email
/// and SMS adapters will sit behind the same trait.
#[derive(Default)]
pub(crate) struct InMemoryNotifier {
    events: Mutex<Vec<RequestEvent>>,
}

impl InMemoryNotifier {
    pub(crate) fn events(&self) -> Vec<RequestEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl NotificationChannel for InMemoryNotifier {
    fn publish(&self, event: RequestEvent) -> Result<(), NotifyError> {
        self.events.lock().expect("event mutex poisoned").push(event);
        Ok(())
    }
}

/// Seeded service used by the CLI commands and tests.
pub(crate) fn demo_service() -> (
    Arc<RequestService<InMemoryRequestStore, InMemoryNotifier>>,
    Arc<InMemoryRequestStore>,
    Arc<InMemoryNotifier>,
) {
    let store = Arc::new(InMemoryRequestStore::default());
    store.seed_directory();
    let notifier = Arc::new(InMemoryNotifier::default());
    let service = Arc::new(RequestService::new(store.clone(), notifier.clone()));
    (service, store, notifier)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

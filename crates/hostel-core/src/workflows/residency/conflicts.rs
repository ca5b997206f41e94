use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::requests::domain::{
    EntityId, MaintenancePriority, RequestDetails, RequestKind, RequestStatus, Student,
};
use super::requests::passes::{DigitalPass, PassStatus};
use super::requests::repository::RequestRecord;

/// Conflict classes the nightly checker reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    OverlappingRequests,
    OrphanedPass,
    OccupiedDuringMaintenance,
}

impl ConflictKind {
    pub const fn label(self) -> &'static str {
        match self {
            ConflictKind::OverlappingRequests => "overlapping_requests",
            ConflictKind::OrphanedPass => "orphaned_pass",
            ConflictKind::OccupiedDuringMaintenance => "occupied_during_maintenance",
        }
    }
}

/// Severity for staff triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Medium,
    High,
}

impl ConflictSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            ConflictSeverity::Medium => "medium",
            ConflictSeverity::High => "high",
        }
    }
}

/// One detected inconsistency, with enough context to resolve it by hand.
/// The checker only reports; it never mutates the records involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub student_id: EntityId,
    pub entities: Vec<EntityId>,
    pub description: String,
    pub suggested_resolution: String,
}

const DEFAULT_GRACE_MINUTES: i64 = 15;

/// Nightly consistency scan over a snapshot of store contents. Pure:
/// running twice on unchanged data yields the identical list. Records
/// written inside the grace window are skipped so in-flight commits are
/// picked up on the next run instead of being flagged mid-write.
#[derive(Debug, Clone)]
pub struct ConflictChecker {
    grace: Duration,
}

impl Default for ConflictChecker {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_MINUTES)
    }
}

impl ConflictChecker {
    pub fn new(grace_minutes: i64) -> Self {
        Self {
            grace: Duration::minutes(grace_minutes.max(0)),
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn scan(
        &self,
        records: &[RequestRecord],
        passes: &[DigitalPass],
        students: &[Student],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<Conflict> {
        let mut settled: Vec<&RequestRecord> = records
            .iter()
            .filter(|record| {
                let last_write = record.decided_at.unwrap_or(record.request.created_at);
                now - last_write >= self.grace
            })
            .collect();
        settled.sort_by(|a, b| a.request.id.as_str().cmp(b.request.id.as_str()));

        let mut settled_passes: Vec<&DigitalPass> = passes
            .iter()
            .filter(|pass| now - pass.issued_at >= self.grace)
            .collect();
        settled_passes.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

        let mut conflicts = Vec::new();
        self.overlapping_requests(&settled, &mut conflicts);
        self.orphaned_passes(&settled_passes, records, &mut conflicts);
        self.occupied_during_maintenance(&settled, students, today, &mut conflicts);
        conflicts
    }

    /// Class (a): a student holding two approved requests of the same type
    /// whose validity windows overlap.
    fn overlapping_requests(&self, settled: &[&RequestRecord], conflicts: &mut Vec<Conflict>) {
        let windowed: Vec<(&RequestRecord, NaiveDate, NaiveDate)> = settled
            .iter()
            .filter(|record| record.request.status == RequestStatus::Approved)
            .filter_map(|record| {
                record
                    .request
                    .window()
                    .map(|(start, end)| (*record, start, end))
            })
            .collect();

        for (i, (first, first_start, first_end)) in windowed.iter().enumerate() {
            for (second, second_start, second_end) in windowed.iter().skip(i + 1) {
                if first.request.student_id != second.request.student_id
                    || first.request.kind() != second.request.kind()
                {
                    continue;
                }
                if first_start <= second_end && second_start <= first_end {
                    let kind = first.request.kind();
                    conflicts.push(Conflict {
                        kind: ConflictKind::OverlappingRequests,
                        severity: ConflictSeverity::Medium,
                        student_id: first.request.student_id.clone(),
                        entities: vec![first.request.id.clone(), second.request.id.clone()],
                        description: format!(
                            "student {} holds overlapping approved {kind} requests {} ({first_start} to {first_end}) and {} ({second_start} to {second_end})",
                            first.request.student_id, first.request.id, second.request.id
                        ),
                        suggested_resolution:
                            "Review both requests with the student and withdraw one of them"
                                .to_string(),
                    });
                }
            }
        }
    }

    /// Class (b): an active pass whose underlying request is missing or no
    /// longer approved.
    fn orphaned_passes(
        &self,
        settled_passes: &[&DigitalPass],
        records: &[RequestRecord],
        conflicts: &mut Vec<Conflict>,
    ) {
        for pass in settled_passes {
            if pass.status != PassStatus::Active {
                continue;
            }
            let backing = records
                .iter()
                .find(|record| record.request.id == pass.request_id);
            let description = match backing {
                Some(record) if record.request.status == RequestStatus::Approved => continue,
                Some(record) => format!(
                    "active pass {} references request {} which is {}",
                    pass.pass_number, pass.request_id, record.request.status
                ),
                None => format!(
                    "active pass {} references missing request {}",
                    pass.pass_number, pass.request_id
                ),
            };
            conflicts.push(Conflict {
                kind: ConflictKind::OrphanedPass,
                severity: ConflictSeverity::High,
                student_id: pass.student_id.clone(),
                entities: vec![pass.id.clone(), pass.request_id.clone()],
                description,
                suggested_resolution: "Cancel the pass or restore the underlying approval"
                    .to_string(),
            });
        }
    }

    /// Class (c): an approved guest visit covering today while the host
    /// student's room has an open approved maintenance work order.
    fn occupied_during_maintenance(
        &self,
        settled: &[&RequestRecord],
        students: &[Student],
        today: NaiveDate,
        conflicts: &mut Vec<Conflict>,
    ) {
        let open_maintenance: Vec<(&RequestRecord, &str, MaintenancePriority)> = settled
            .iter()
            .filter(|record| record.request.status == RequestStatus::Approved)
            .filter_map(|record| match &record.request.details {
                RequestDetails::Maintenance(issue) => {
                    Some((*record, issue.room_number.as_str(), issue.priority))
                }
                _ => None,
            })
            .collect();

        if open_maintenance.is_empty() {
            return;
        }

        for record in settled {
            if record.request.status != RequestStatus::Approved
                || record.request.kind() != RequestKind::Guest
            {
                continue;
            }
            let covers_today = record
                .request
                .window()
                .map(|(start, end)| start <= today && today <= end)
                .unwrap_or(false);
            if !covers_today {
                continue;
            }
            let Some(student) = students
                .iter()
                .find(|student| student.id == record.request.student_id)
            else {
                continue;
            };
            for (work_order, room, priority) in &open_maintenance {
                if *room != student.room_number {
                    continue;
                }
                let severity = if *priority == MaintenancePriority::Emergency {
                    ConflictSeverity::High
                } else {
                    ConflictSeverity::Medium
                };
                conflicts.push(Conflict {
                    kind: ConflictKind::OccupiedDuringMaintenance,
                    severity,
                    student_id: student.id.clone(),
                    entities: vec![
                        record.request.id.clone(),
                        work_order.request.id.clone(),
                    ],
                    description: format!(
                        "guest visit {} expects room {} occupied today while {} maintenance {} is open",
                        record.request.id, student.room_number, priority.label(), work_order.request.id
                    ),
                    suggested_resolution:
                        "Reschedule the work order or move the guest visit".to_string(),
                });
            }
        }
    }
}

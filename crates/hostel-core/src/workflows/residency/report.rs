use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::requests::domain::{
    EntityId, MaintenanceCategory, MaintenancePriority, RequestDetails, RequestStatus, Student,
};
use super::requests::repository::RequestRecord;

/// A student away on approved leave covering the report date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwayEntry {
    pub student_id: EntityId,
    pub student_name: String,
    pub room_number: String,
    pub until: NaiveDate,
}

/// A guest expected to arrive on the report date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestEntry {
    pub student_id: EntityId,
    pub student_name: String,
    pub room_number: String,
    pub guest_name: String,
}

/// An open maintenance item awaiting triage or work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceEntry {
    pub request_id: EntityId,
    pub room_number: String,
    pub category: MaintenanceCategory,
    pub priority: MaintenancePriority,
    pub description: String,
}

/// Morning operational snapshot handed to hostel staff. Pure over store
/// contents; compiling it twice on unchanged data gives the same report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub students_away: Vec<AwayEntry>,
    pub guests_expected: Vec<GuestEntry>,
    pub open_maintenance: Vec<MaintenanceEntry>,
    pub urgent_maintenance: Vec<MaintenanceEntry>,
    pub pending_requests: usize,
}

impl DailyReport {
    pub fn compile(records: &[RequestRecord], students: &[Student], today: NaiveDate) -> Self {
        let mut students_away = Vec::new();
        let mut guests_expected = Vec::new();
        let mut open_maintenance = Vec::new();
        let mut urgent_maintenance = Vec::new();
        let mut pending_requests = 0;

        for record in records {
            let request = &record.request;
            if request.status.is_pending() {
                pending_requests += 1;
            }

            match &request.details {
                RequestDetails::Leave(span) => {
                    if request.status == RequestStatus::Approved
                        && span.from_date <= today
                        && today <= span.to_date
                    {
                        if let Some(student) = resolve(students, &request.student_id) {
                            students_away.push(AwayEntry {
                                student_id: student.id.clone(),
                                student_name: student.name.clone(),
                                room_number: student.room_number.clone(),
                                until: span.to_date,
                            });
                        }
                    }
                }
                RequestDetails::Guest(visit) => {
                    if request.status == RequestStatus::Approved
                        && visit.arrival.date_naive() == today
                    {
                        if let Some(student) = resolve(students, &request.student_id) {
                            guests_expected.push(GuestEntry {
                                student_id: student.id.clone(),
                                student_name: student.name.clone(),
                                room_number: student.room_number.clone(),
                                guest_name: visit.guest_name.clone(),
                            });
                        }
                    }
                }
                RequestDetails::Maintenance(issue) => {
                    if request.status.is_pending() {
                        let entry = MaintenanceEntry {
                            request_id: request.id.clone(),
                            room_number: issue.room_number.clone(),
                            category: issue.category,
                            priority: issue.priority,
                            description: issue.description.clone(),
                        };
                        if issue.priority == MaintenancePriority::Emergency {
                            urgent_maintenance.push(entry.clone());
                        }
                        open_maintenance.push(entry);
                    }
                }
            }
        }

        students_away.sort_by(|a, b| a.room_number.cmp(&b.room_number));
        guests_expected.sort_by(|a, b| a.room_number.cmp(&b.room_number));
        open_maintenance.sort_by(|a, b| a.room_number.cmp(&b.room_number));
        urgent_maintenance.sort_by(|a, b| a.room_number.cmp(&b.room_number));

        Self {
            date: today,
            students_away,
            guests_expected,
            open_maintenance,
            urgent_maintenance,
            pending_requests,
        }
    }

    /// Plain-text rendering suitable for a morning staff message.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        writeln!(out, "Morning report for {}", self.date).expect("write header");

        writeln!(out, "Students away today: {}", self.students_away.len()).expect("write away");
        for entry in &self.students_away {
            writeln!(
                out,
                "  - {} (room {}) away until {}",
                entry.student_name, entry.room_number, entry.until
            )
            .expect("write away entry");
        }

        writeln!(out, "Guests expected today: {}", self.guests_expected.len())
            .expect("write guests");
        for entry in &self.guests_expected {
            writeln!(
                out,
                "  - {} visiting {} (room {})",
                entry.guest_name, entry.student_name, entry.room_number
            )
            .expect("write guest entry");
        }

        writeln!(out, "Open maintenance: {}", self.open_maintenance.len())
            .expect("write maintenance");
        for entry in &self.open_maintenance {
            writeln!(
                out,
                "  - room {}: {} ({} priority)",
                entry.room_number,
                entry.category.label(),
                entry.priority.label()
            )
            .expect("write maintenance entry");
        }

        if !self.urgent_maintenance.is_empty() {
            writeln!(out, "URGENT: {} emergency item(s)", self.urgent_maintenance.len())
                .expect("write urgent");
            for entry in &self.urgent_maintenance {
                writeln!(out, "  - room {}: {}", entry.room_number, entry.description)
                    .expect("write urgent entry");
            }
        }

        writeln!(
            out,
            "Pending requests awaiting staff: {}",
            self.pending_requests
        )
        .expect("write pending");
        out
    }
}

fn resolve<'a>(students: &'a [Student], id: &EntityId) -> Option<&'a Student> {
    students.iter().find(|student| &student.id == id)
}

use chrono::{DateTime, Utc};

use super::super::domain::{MaintenancePriority, Request, RequestDetails, Student};
use super::config::PolicyConfig;

/// How much warning the hostel got before a guest arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeSignal {
    Sufficient,
    Short,
    Imminent,
}

/// Facts extracted from a request, separated from the verdict so the
/// decision step stays a plain match over data.
pub(crate) struct RuleSignals {
    pub violation_count: u32,
    pub clean_record: bool,
    pub nights: Option<i64>,
    pub total_days: Option<i64>,
    pub notice: Option<NoticeSignal>,
    pub basic_category: Option<bool>,
    pub emergency: bool,
    pub missing_field: Option<&'static str>,
    pub inverted_window: bool,
}

pub(crate) fn assess_request(
    request: &Request,
    student: &Student,
    config: &PolicyConfig,
    now: DateTime<Utc>,
) -> (Vec<&'static str>, RuleSignals) {
    let mut signals = RuleSignals {
        violation_count: student.violation_count,
        clean_record: student.has_clean_record(),
        nights: None,
        total_days: None,
        notice: None,
        basic_category: None,
        emergency: false,
        missing_field: None,
        inverted_window: false,
    };

    let rules: Vec<&'static str> = match &request.details {
        RequestDetails::Guest(visit) => {
            if visit.guest_name.trim().is_empty() {
                signals.missing_field = Some("guest name");
            }
            if visit.departure <= visit.arrival {
                signals.inverted_window = true;
            }

            signals.nights = Some(visit.nights());

            let lead_hours = (visit.arrival - now).num_hours();
            signals.notice = Some(if lead_hours < config.imminent_arrival_hours {
                NoticeSignal::Imminent
            } else if lead_hours < config.min_advance_notice_hours {
                NoticeSignal::Short
            } else {
                NoticeSignal::Sufficient
            });

            vec![
                "guest_duration_limit",
                "student_record_check",
                "advance_notice_requirement",
            ]
        }
        RequestDetails::Leave(span) => {
            if span.reason.trim().is_empty() {
                signals.missing_field = Some("reason");
            }
            if span.to_date < span.from_date {
                signals.inverted_window = true;
            }

            let total_days = span.total_days();
            signals.total_days = Some(total_days);

            let mut rules = vec!["leave_duration_check"];
            if total_days > config.max_leave_days {
                rules.push("leave_maximum_duration");
            }
            rules
        }
        RequestDetails::Maintenance(issue) => {
            if issue.room_number.trim().is_empty() {
                signals.missing_field = Some("room number");
            } else if issue.description.trim().is_empty() {
                signals.missing_field = Some("description");
            }

            signals.emergency = issue.priority == MaintenancePriority::Emergency;
            signals.basic_category = Some(config.is_basic_maintenance(issue.category));

            if signals.emergency {
                vec!["emergency_maintenance_priority"]
            } else if signals.basic_category == Some(true) {
                vec!["basic_maintenance_auto_schedule"]
            } else {
                vec!["complex_maintenance_manual_review"]
            }
        }
    };

    if signals.missing_field.is_some() || signals.inverted_window {
        return (vec!["mandatory_field_check"], signals);
    }

    (rules, signals)
}

use chrono::NaiveDate;

use super::domain::{GuestVisit, LeaveSpan, MaintenanceIssue, RequestDetails, RequestSubmission};
use super::policy::PolicyConfig;

/// Validation errors raised during intake or on malformed staff input.
/// A submission that fails here is never persisted.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required information: {field}")]
    MissingField { field: &'static str },
    #[error("guest departure must be after arrival")]
    DepartureBeforeArrival,
    #[error("leave end date cannot be before the start date")]
    InvertedLeaveDates,
    #[error("leave start date cannot be in the past")]
    LeaveStartInPast,
    #[error("leave duration cannot exceed {max} days (requested {requested})")]
    LeaveTooLong { requested: i64, max: i64 },
    #[error("rejection requires a non-empty reason")]
    MissingRejectionReason,
}

const DEFAULT_MAX_LEAVE_DAYS: i64 = 30;

/// Hard bounds applied before a submission becomes a request, as opposed to
/// the policy thresholds that merely route a request to staff.
#[derive(Debug, Clone)]
pub struct IntakePolicy {
    max_leave_days: i64,
}

impl IntakePolicy {
    pub fn new(max_leave_days: i64) -> Self {
        let sanitized = if max_leave_days > 0 {
            max_leave_days
        } else {
            DEFAULT_MAX_LEAVE_DAYS
        };

        Self {
            max_leave_days: sanitized,
        }
    }

    pub fn max_leave_days(&self) -> i64 {
        self.max_leave_days
    }
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEAVE_DAYS)
    }
}

impl From<&PolicyConfig> for IntakePolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self::new(config.max_leave_days)
    }
}

/// Guard turning raw submissions into validated request details.
#[derive(Debug, Clone)]
pub struct IntakeGuard {
    policy: IntakePolicy,
}

impl Default for IntakeGuard {
    fn default() -> Self {
        Self::with_policy(IntakePolicy::default())
    }
}

impl IntakeGuard {
    pub fn with_policy(policy: IntakePolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::with_policy(IntakePolicy::from(config))
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// Convert an inbound submission into validated request details.
    pub fn details_from_submission(
        &self,
        submission: RequestSubmission,
        today: NaiveDate,
    ) -> Result<RequestDetails, ValidationError> {
        match submission {
            RequestSubmission::Guest(guest) => {
                let guest_name = guest.guest_name.trim().to_string();
                if guest_name.is_empty() {
                    return Err(ValidationError::MissingField {
                        field: "guest name",
                    });
                }

                if guest.departure <= guest.arrival {
                    return Err(ValidationError::DepartureBeforeArrival);
                }

                Ok(RequestDetails::Guest(GuestVisit {
                    guest_name,
                    relationship: normalize_optional(guest.relationship),
                    arrival: guest.arrival,
                    departure: guest.departure,
                    purpose: normalize_optional(guest.purpose),
                }))
            }
            RequestSubmission::Leave(leave) => {
                let reason = leave.reason.trim().to_string();
                if reason.is_empty() {
                    return Err(ValidationError::MissingField { field: "reason" });
                }

                if leave.to_date < leave.from_date {
                    return Err(ValidationError::InvertedLeaveDates);
                }

                if leave.from_date < today {
                    return Err(ValidationError::LeaveStartInPast);
                }

                let span = LeaveSpan {
                    from_date: leave.from_date,
                    to_date: leave.to_date,
                    reason,
                    emergency_contact: normalize_optional(leave.emergency_contact),
                };

                let requested = span.total_days();
                if requested > self.policy.max_leave_days {
                    return Err(ValidationError::LeaveTooLong {
                        requested,
                        max: self.policy.max_leave_days,
                    });
                }

                Ok(RequestDetails::Leave(span))
            }
            RequestSubmission::Maintenance(issue) => {
                let room_number = issue.room_number.trim().to_string();
                if room_number.is_empty() {
                    return Err(ValidationError::MissingField {
                        field: "room number",
                    });
                }

                let description = issue.description.trim().to_string();
                if description.is_empty() {
                    return Err(ValidationError::MissingField {
                        field: "description",
                    });
                }

                Ok(RequestDetails::Maintenance(MaintenanceIssue {
                    room_number,
                    category: issue.category,
                    description,
                    priority: issue.priority,
                    scheduled_for: None,
                }))
            }
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

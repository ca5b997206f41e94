use serde::{Deserialize, Serialize};

use super::super::domain::{Request, RequestDetails, StaffRole};
use super::config::PolicyConfig;
use super::rules::{NoticeSignal, RuleSignals};

/// Policy verdict for one request. `Invalid` marks a request missing
/// mandatory data and is deliberately distinct from `Reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AutoApprove,
    Escalate,
    Reject,
    Invalid,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::AutoApprove => "auto_approve",
            Verdict::Escalate => "escalate",
            Verdict::Reject => "reject",
            Verdict::Invalid => "invalid",
        }
    }
}

/// Priority an escalated request carries onto a staff queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl EscalationPriority {
    pub const fn label(self) -> &'static str {
        match self {
            EscalationPriority::Low => "low",
            EscalationPriority::Medium => "medium",
            EscalationPriority::High => "high",
            EscalationPriority::Urgent => "urgent",
        }
    }
}

/// Routing hint telling the dashboard which staff queue an escalated
/// request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRoute {
    pub assignee: StaffRole,
    pub priority: EscalationPriority,
}

pub(crate) struct VerdictOutcome {
    pub verdict: Verdict,
    pub reasoning: String,
    pub route: Option<EscalationRoute>,
    pub urgent_alert: bool,
}

impl VerdictOutcome {
    fn terminal(verdict: Verdict, reasoning: String) -> Self {
        Self {
            verdict,
            reasoning,
            route: None,
            urgent_alert: false,
        }
    }
}

pub(crate) fn decide_verdict(
    request: &Request,
    config: &PolicyConfig,
    signals: &RuleSignals,
) -> VerdictOutcome {
    if let Some(field) = signals.missing_field {
        return VerdictOutcome::terminal(
            Verdict::Invalid,
            format!("Missing required information: {field}"),
        );
    }

    if signals.inverted_window {
        let reasoning = match &request.details {
            RequestDetails::Guest(_) => "Guest departure must be after arrival".to_string(),
            _ => "Leave end date cannot be before the start date".to_string(),
        };
        return VerdictOutcome::terminal(Verdict::Invalid, reasoning);
    }

    match &request.details {
        RequestDetails::Guest(visit) => {
            let nights = signals.nights.unwrap_or_else(|| visit.nights());

            let mut reasons = Vec::new();
            if nights > config.max_auto_guest_nights {
                reasons.push(format!(
                    "{nights}-night stay exceeds the {}-night auto-approval limit",
                    config.max_auto_guest_nights
                ));
            }
            if !signals.clean_record {
                reasons.push(format!(
                    "student record shows {} violation(s)",
                    signals.violation_count
                ));
            }

            if reasons.is_empty() {
                let notice_note = match signals.notice {
                    Some(NoticeSignal::Imminent) => " (imminent arrival, gate notified)",
                    Some(NoticeSignal::Short) => " (short notice)",
                    _ => "",
                };
                return VerdictOutcome::terminal(
                    Verdict::AutoApprove,
                    format!(
                        "Auto-approved: {nights}-night guest visit with a clean student record{notice_note}"
                    ),
                );
            }

            let priority = if signals.violation_count > 0 {
                EscalationPriority::High
            } else {
                EscalationPriority::Medium
            };

            VerdictOutcome {
                verdict: Verdict::Escalate,
                reasoning: format!("Escalated for warden review: {}", reasons.join("; ")),
                route: Some(EscalationRoute {
                    assignee: StaffRole::Warden,
                    priority,
                }),
                urgent_alert: false,
            }
        }
        RequestDetails::Leave(span) => {
            let total_days = signals.total_days.unwrap_or_else(|| span.total_days());

            if total_days > config.max_leave_days {
                return VerdictOutcome::terminal(
                    Verdict::Reject,
                    format!(
                        "Rejected: leave of {total_days} days exceeds the {}-day maximum",
                        config.max_leave_days
                    ),
                );
            }

            if total_days <= config.max_auto_leave_days {
                return VerdictOutcome::terminal(
                    Verdict::AutoApprove,
                    format!(
                        "Auto-approved: leave duration ({total_days} days) meets auto-approval criteria"
                    ),
                );
            }

            let priority = if total_days > config.extended_leave_days {
                EscalationPriority::Medium
            } else {
                EscalationPriority::Low
            };

            VerdictOutcome {
                verdict: Verdict::Escalate,
                reasoning: format!(
                    "Escalated for warden review: {total_days}-day leave exceeds the {}-day auto-approval limit",
                    config.max_auto_leave_days
                ),
                route: Some(EscalationRoute {
                    assignee: StaffRole::Warden,
                    priority,
                }),
                urgent_alert: false,
            }
        }
        RequestDetails::Maintenance(issue) => {
            if signals.emergency {
                return VerdictOutcome {
                    verdict: Verdict::AutoApprove,
                    reasoning: format!(
                        "Auto-approved: emergency {} work order scheduled immediately",
                        issue.category.label()
                    ),
                    route: None,
                    urgent_alert: true,
                };
            }

            if signals.basic_category == Some(true) {
                return VerdictOutcome::terminal(
                    Verdict::AutoApprove,
                    format!(
                        "Auto-approved: {} work order scheduled",
                        issue.category.label()
                    ),
                );
            }

            VerdictOutcome {
                verdict: Verdict::Escalate,
                reasoning: format!(
                    "Escalated for maintenance triage: {} issues require manual assessment",
                    issue.category.label()
                ),
                route: Some(EscalationRoute {
                    assignee: StaffRole::Maintenance,
                    priority: EscalationPriority::Medium,
                }),
                urgent_alert: false,
            }
        }
    }
}

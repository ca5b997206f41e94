mod config;
mod rules;
mod verdict;

pub use config::PolicyConfig;
pub use verdict::{EscalationPriority, EscalationRoute, Verdict};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{EntityId, Request, Student};
use verdict::decide_verdict;

/// Stateless evaluator applying the hostel policy to a request. Pure:
/// callers apply the verdict through the lifecycle service and record it
/// in the audit log.
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn evaluate(&self, request: &Request, student: &Student, now: DateTime<Utc>) -> Evaluation {
        let (mut rules, signals) = rules::assess_request(request, student, &self.config, now);

        let outcome = decide_verdict(request, &self.config, &signals);
        if outcome.verdict == Verdict::Escalate {
            rules.push("manual_review_required");
        }

        let confidence = match outcome.verdict {
            Verdict::AutoApprove | Verdict::Reject | Verdict::Invalid => 1.0,
            Verdict::Escalate => {
                (0.9 - 0.1 * signals.violation_count as f32).max(0.1)
            }
        };

        Evaluation {
            request_id: request.id.clone(),
            verdict: outcome.verdict,
            reasoning: outcome.reasoning,
            confidence,
            rules_applied: rules.into_iter().map(str::to_string).collect(),
            route: outcome.route,
            urgent_alert: outcome.urgent_alert,
        }
    }
}

/// Evaluation output: the verdict plus the trail that justifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub request_id: EntityId,
    pub verdict: Verdict,
    pub reasoning: String,
    pub confidence: f32,
    pub rules_applied: Vec<String>,
    pub route: Option<EscalationRoute>,
    pub urgent_alert: bool,
}

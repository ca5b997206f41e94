use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::domain::{EntityId, Request, RequestDetails, RequestKind, RequestStatus, Student};

const VERIFICATION_CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Pass lifecycle, driven by the expiry sweep rather than mutation-on-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Active,
    Expired,
    Cancelled,
}

impl PassStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PassStatus::Active => "active",
            PassStatus::Expired => "expired",
            PassStatus::Cancelled => "cancelled",
        }
    }
}

/// How the underlying leave was approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassApproval {
    Auto,
    Manual { staff_id: EntityId },
}

/// Verifiable permission to be away for an approved date range. Derived
/// exactly once from its leave request; the window is copied at issuance
/// and never re-derived from the request afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalPass {
    pub id: EntityId,
    pub pass_number: String,
    pub verification_code: String,
    pub request_id: EntityId,
    pub student_id: EntityId,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub total_days: i64,
    pub reason: String,
    pub approval: PassApproval,
    pub status: PassStatus,
    pub issued_at: DateTime<Utc>,
}

impl DigitalPass {
    /// Valid means active and inside the window, inclusive on both ends.
    pub fn is_valid(&self, today: NaiveDate) -> bool {
        self.status == PassStatus::Active && self.from_date <= today && today <= self.to_date
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        ((self.to_date - today).num_days() + 1).max(0)
    }
}

static PASS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_pass_id() -> EntityId {
    let id = PASS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EntityId(format!("pass-{id:06}"))
}

/// Raised only on misuse of the issuer; the public submit/decide paths
/// cannot reach these states.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error("request {request_id} is {status} and cannot carry a pass")]
    NotApproved {
        request_id: EntityId,
        status: RequestStatus,
    },
    #[error("request {request_id} is a {kind} request; passes only cover leave")]
    NotLeave {
        request_id: EntityId,
        kind: RequestKind,
    },
}

/// Derives a pass from an approved leave request. Fresh randomness is used
/// for the number suffix and the verification code; callers own the check
/// that the minted number is unused.
#[derive(Debug, Default)]
pub struct PassIssuer;

impl PassIssuer {
    pub fn new() -> Self {
        Self
    }

    pub fn issue(
        &self,
        request: &Request,
        approval: PassApproval,
        issued_at: DateTime<Utc>,
    ) -> Result<DigitalPass, IssuanceError> {
        if request.status != RequestStatus::Approved {
            return Err(IssuanceError::NotApproved {
                request_id: request.id.clone(),
                status: request.status,
            });
        }

        let span = match &request.details {
            RequestDetails::Leave(span) => span,
            _ => {
                return Err(IssuanceError::NotLeave {
                    request_id: request.id.clone(),
                    kind: request.kind(),
                })
            }
        };

        Ok(DigitalPass {
            id: next_pass_id(),
            pass_number: mint_pass_number(issued_at.date_naive()),
            verification_code: mint_verification_code(),
            request_id: request.id.clone(),
            student_id: request.student_id.clone(),
            from_date: span.from_date,
            to_date: span.to_date,
            total_days: span.total_days(),
            reason: span.reason.clone(),
            approval,
            status: PassStatus::Active,
            issued_at,
        })
    }
}

fn mint_pass_number(date: NaiveDate) -> String {
    let suffix = OsRng.next_u32() % 10_000;
    format!("LP-{}-{suffix:04}", date.format("%Y%m%d"))
}

fn mint_verification_code() -> String {
    let mut code = String::with_capacity(VERIFICATION_CODE_LEN);
    for _ in 0..VERIFICATION_CODE_LEN {
        let idx = OsRng.next_u32() as usize % CODE_ALPHABET.len();
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}

/// What security sees when checking a pass number at the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassVerification {
    pub pass_number: String,
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

impl PassVerification {
    pub fn unknown(pass_number: &str) -> Self {
        Self {
            pass_number: pass_number.to_string(),
            valid: false,
            message: "No pass found with this number".to_string(),
            student_name: None,
            room_number: None,
            from_date: None,
            to_date: None,
            days_remaining: None,
        }
    }

    pub fn checked(pass: &DigitalPass, student: Option<&Student>, today: NaiveDate) -> Self {
        let valid = pass.is_valid(today);
        let message = if valid {
            "Pass is valid".to_string()
        } else if pass.status != PassStatus::Active {
            format!("Pass is {}", pass.status.label())
        } else {
            "Pass is expired or not yet valid".to_string()
        };

        Self {
            pass_number: pass.pass_number.clone(),
            valid,
            message,
            student_name: student.map(|s| s.name.clone()),
            room_number: student.map(|s| s.room_number.clone()),
            from_date: Some(pass.from_date),
            to_date: Some(pass.to_date),
            days_remaining: Some(pass.days_remaining(today)),
        }
    }
}

/// Filters for pass history queries; present conditions are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassQuery {
    pub student_id: Option<EntityId>,
    pub status: Option<PassStatus>,
    /// Keep only passes whose window covers this date.
    pub active_on: Option<NaiveDate>,
}

impl PassQuery {
    pub fn matches(&self, pass: &DigitalPass) -> bool {
        if let Some(student_id) = &self.student_id {
            if &pass.student_id != student_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if pass.status != status {
                return false;
            }
        }
        if let Some(date) = self.active_on {
            if pass.from_date > date || pass.to_date < date {
                return false;
            }
        }
        true
    }
}

/// Rendering error reported by pass document backends.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pass rendering failed: {0}")]
    Backend(String),
}

/// Seam for producing a printable pass document. The structured record is
/// authoritative; rendering is presentation only and never gates issuance.
pub trait PassRenderer: Send + Sync {
    fn render(&self, pass: &DigitalPass, student: &Student) -> Result<Vec<u8>, RenderError>;
}

/// Plain-text pass document, used by the CLI and as the default backend.
#[derive(Debug, Default)]
pub struct TextPassRenderer;

impl PassRenderer for TextPassRenderer {
    fn render(&self, pass: &DigitalPass, student: &Student) -> Result<Vec<u8>, RenderError> {
        let mut doc = String::new();
        writeln!(doc, "HOSTEL LEAVE PASS").expect("write title");
        writeln!(doc, "Pass number: {}", pass.pass_number).expect("write pass number");
        writeln!(doc, "Verification code: {}", pass.verification_code).expect("write code");
        writeln!(
            doc,
            "Student: {} (room {}, block {})",
            student.name, student.room_number, student.block
        )
        .expect("write student");
        writeln!(
            doc,
            "Valid: {} to {} ({} day(s))",
            pass.from_date, pass.to_date, pass.total_days
        )
        .expect("write window");
        writeln!(doc, "Reason: {}", pass.reason).expect("write reason");
        let attribution = match &pass.approval {
            PassApproval::Auto => "system auto-approval".to_string(),
            PassApproval::Manual { staff_id } => format!("staff {staff_id}"),
        };
        writeln!(doc, "Approved by: {attribution}").expect("write attribution");
        writeln!(doc, "Issued: {}", pass.issued_at.format("%Y-%m-%d %H:%M UTC"))
            .expect("write issued");
        Ok(doc.into_bytes())
    }
}

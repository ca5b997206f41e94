use crate::infra::{demo_service, InMemoryNotifier, InMemoryRequestStore};
use chrono::{Local, NaiveDate, Utc};
use clap::Args;
use hostel_core::error::AppError;
use hostel_core::workflows::residency::requests::{
    Actor, AuditQuery, DecisionInput, EntityId, GuestSubmission, LeaveSubmission,
    MaintenanceCategory, MaintenancePriority, MaintenanceSubmission, PassRenderer, RequestDetails,
    RequestRecord, RequestService, RequestStatus, RequestStore, RequestSubmission, StaffDecision,
    TextPassRenderer,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Reporting date for the morning report and nightly scan (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Length of the demo leave in days; anything above two routes to the warden
    #[arg(long, default_value_t = 5)]
    pub(crate) leave_days: i64,
    /// Include the full audit trail at the end of the demo output
    #[arg(long)]
    pub(crate) include_audit: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SummaryArgs {
    /// Reporting date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Cutoff date for the expiry sweep and conflict scan (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_summary(args: SummaryArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let (service, _store, _notifier) = demo_service();
    seed_morning_activity(&service)?;

    let report = service.morning_report(today)?;
    println!("{}", report.render_text());
    Ok(())
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let (service, _store, _notifier) = demo_service();
    seed_morning_activity(&service)?;

    println!("Overnight check for {}", today);

    let sweep = service.expire_overdue(today)?;
    if sweep.is_empty() {
        println!("Expiry sweep: nothing due");
    } else {
        println!(
            "Expiry sweep: {} request(s) and {} pass(es) retired",
            sweep.expired_requests.len(),
            sweep.expired_passes.len()
        );
        for id in &sweep.expired_requests {
            println!("  - request {}", id);
        }
        for id in &sweep.expired_passes {
            println!("  - pass {}", id);
        }
    }

    let conflicts = service.run_nightly_check(today)?;
    if conflicts.is_empty() {
        println!("Conflict scan: clean");
    } else {
        println!("Conflict scan: {} finding(s)", conflicts.len());
        for conflict in &conflicts {
            println!("  - [{}] {}", conflict.severity.label(), conflict.description);
            println!("    {}", conflict.suggested_resolution);
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        leave_days,
        include_audit,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let leave_days = leave_days.max(1);

    println!("Hostel request workflow demo");

    let (service, store, notifier) = demo_service();

    println!("\nGuest visit intake");
    let arrival = Utc::now() + chrono::Duration::hours(30);
    let guest = match service.submit(
        EntityId::new("stu-101"),
        RequestSubmission::Guest(GuestSubmission {
            guest_name: "Rohan Mehta".to_string(),
            relationship: Some("brother".to_string()),
            arrival,
            departure: arrival + chrono::Duration::days(1),
            purpose: Some("family visit".to_string()),
        }),
    ) {
        Ok(record) => record,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };
    print_outcome(&guest);

    println!("\nLeave intake ({} day(s) from today)", leave_days);
    let from_date = Utc::now().date_naive();
    let leave = match service.submit(
        EntityId::new("stu-101"),
        RequestSubmission::Leave(LeaveSubmission {
            from_date,
            to_date: from_date + chrono::Duration::days(leave_days - 1),
            reason: "family function at home".to_string(),
            emergency_contact: Some("+91-98100-00000".to_string()),
        }),
    ) {
        Ok(record) => record,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };
    print_outcome(&leave);

    let leave = if leave.request.status == RequestStatus::Pending {
        match service.staff_decide(
            &leave.request.id,
            DecisionInput {
                staff_id: EntityId::new("staff-warden"),
                decision: StaffDecision::Approve,
                reason: Some("travel plan confirmed with the family".to_string()),
            },
        ) {
            Ok(decided) => {
                println!("  Warden decision: {}", decided.request.status.label());
                decided
            }
            Err(err) => {
                println!("  Warden decision failed: {}", err);
                return Ok(());
            }
        }
    } else {
        leave
    };

    match service.pass_for_request(&leave.request.id) {
        Ok(Some(pass)) => {
            println!("\nDigital pass {}", pass.pass_number);
            match store.student(&pass.student_id) {
                Ok(Some(student)) => match TextPassRenderer.render(&pass, &student) {
                    Ok(document) => println!("{}", String::from_utf8_lossy(&document)),
                    Err(err) => println!("  Pass document unavailable: {}", err),
                },
                Ok(None) => println!("  Student record missing; skipping the printable pass"),
                Err(err) => println!("  Store unavailable: {}", err),
            }

            match service.verify_pass(
                &pass.pass_number,
                Actor::Staff(EntityId::new("staff-security")),
            ) {
                Ok(verification) => {
                    println!("Gate check: {}", verification.message);
                    if let Some(days) = verification.days_remaining {
                        println!("  {} day(s) of validity remaining", days);
                    }
                }
                Err(err) => println!("Gate check unavailable: {}", err),
            }
        }
        Ok(None) => println!("\nNo pass on file for the leave request"),
        Err(err) => println!("\nPass lookup failed: {}", err),
    }

    println!("\nMaintenance intake");
    let repair = match service.submit(
        EntityId::new("stu-102"),
        RequestSubmission::Maintenance(MaintenanceSubmission {
            room_number: "B-104".to_string(),
            category: MaintenanceCategory::ElectricalMajor,
            description: "sparking socket beside the study desk".to_string(),
            priority: MaintenancePriority::Emergency,
        }),
    ) {
        Ok(record) => record,
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };
    print_outcome(&repair);
    if let RequestDetails::Maintenance(issue) = &repair.request.details {
        if let Some(date) = issue.scheduled_for {
            println!("  Work order scheduled for {}", date);
        }
    }

    let events = notifier.events();
    if events.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications");
        for event in &events {
            println!("- [{}] {}", event.kind.label(), event.summary);
        }
    }

    println!();
    let report = service.morning_report(today)?;
    println!("{}", report.render_text());

    let conflicts = service.run_nightly_check(today)?;
    if conflicts.is_empty() {
        println!("\nNightly check: no conflicts");
    } else {
        println!("\nNightly check: {} finding(s)", conflicts.len());
        for conflict in &conflicts {
            println!("- [{}] {}", conflict.severity.label(), conflict.description);
        }
    }

    if include_audit {
        let entries = service.audit_trail(&AuditQuery::default())?;
        println!("\nAudit trail ({} entries, newest first)", entries.len());
        for entry in &entries {
            println!(
                "- {} {} -> {} (confidence {:.2})",
                entry.recorded_at.format("%H:%M:%S"),
                entry.action.label(),
                entry.reasoning,
                entry.confidence
            );
        }
    }

    Ok(())
}

fn seed_morning_activity(
    service: &RequestService<InMemoryRequestStore, InMemoryNotifier>,
) -> Result<(), AppError> {
    let from_date = Utc::now().date_naive();
    service.submit(
        EntityId::new("stu-101"),
        RequestSubmission::Leave(LeaveSubmission {
            from_date,
            to_date: from_date + chrono::Duration::days(1),
            reason: "weekend at home".to_string(),
            emergency_contact: None,
        }),
    )?;

    let arrival = Utc::now() + chrono::Duration::hours(2);
    service.submit(
        EntityId::new("stu-103"),
        RequestSubmission::Guest(GuestSubmission {
            guest_name: "Kavita Pillai".to_string(),
            relationship: Some("mother".to_string()),
            arrival,
            departure: arrival + chrono::Duration::days(1),
            purpose: Some("campus visit".to_string()),
        }),
    )?;

    service.submit(
        EntityId::new("stu-102"),
        RequestSubmission::Maintenance(MaintenanceSubmission {
            room_number: "B-104".to_string(),
            category: MaintenanceCategory::Structural,
            description: "ceiling crack above the door frame".to_string(),
            priority: MaintenancePriority::Medium,
        }),
    )?;

    Ok(())
}

fn print_outcome(record: &RequestRecord) {
    let view = record.status_view();
    println!("- Request {} -> {}", view.request_id, view.status);
    println!("  {}", view.decision_rationale);
    if let Some(route) = &view.route {
        println!("  Routed to {} ({} priority)", route.assignee.label(), route.priority.label());
    }
}

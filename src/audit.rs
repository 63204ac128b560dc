//! Security event logging.
//!
//! Authentication and authorization outcomes are emitted as OCSF
//! Authentication (3001) JSON records on the `ocsf` tracing target. Generic
//! back-office actions go through [`record`] on the `audit` target. Neither
//! path can fail the request that produced the event.

use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::metrics::Metrics;

pub const CLASS_AUTHENTICATION: u32 = 3001;

const PRODUCT_NAME: &str = "throtle-console";
const VENDOR_NAME: &str = "Throtle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Logon,
    Logoff,
    /// OAuth authorization-code exchange.
    AuthTicket,
    /// Authorization decisions.
    Other,
}

impl Activity {
    fn id(self) -> u32 {
        match self {
            Activity::Logon => 1,
            Activity::Logoff => 2,
            Activity::AuthTicket => 3,
            Activity::Other => 99,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Activity::Logon => "Logon",
            Activity::Logoff => "Logoff",
            Activity::AuthTicket => "Authentication Ticket",
            Activity::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    fn id(self) -> u32 {
        match self {
            Outcome::Success => 1,
            Outcome::Failure => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Failure => "Failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
}

impl Severity {
    fn id(self) -> u32 {
        match self {
            Severity::Informational => 1,
            Severity::Low => 2,
            Severity::Medium => 3,
            Severity::High => 4,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Severity::Informational => "Informational",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn base_event(activity: Activity, outcome: Outcome, severity: Severity, message: &str) -> Value {
    json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": activity.id(),
        "activity_name": activity.name(),
        "severity_id": severity.id(),
        "severity": severity.name(),
        "status_id": outcome.id(),
        "status": outcome.name(),
        "time": now_millis(),
        "metadata": {
            "product": {
                "name": PRODUCT_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "vendor_name": VENDOR_NAME
            }
        },
        "message": message,
    })
}

fn with_actor(mut event: Value, user_email: Option<&str>) -> Value {
    if let Some(email) = user_email.filter(|e| !e.is_empty()) {
        event["actor"] = json!({
            "user": {
                "email_addr": email,
                "type_id": 1,
                "type": "User"
            }
        });
    }
    event
}

fn emit(event: &Value) {
    if let Ok(json) = serde_json::to_string(event) {
        tracing::info!(target: "ocsf", "{}", json);
    }
}

/// Build an OCSF Authentication event for the OAuth 2.0/OIDC flow.
pub fn build_authentication_event(
    activity: Activity,
    outcome: Outcome,
    severity: Severity,
    user_email: Option<&str>,
    message: &str,
) -> Value {
    let mut event = base_event(activity, outcome, severity, message);
    event["auth_protocol_id"] = json!(10);
    event["auth_protocol"] = json!("OAuth 2.0/OIDC");
    with_actor(event, user_email)
}

pub fn authentication_event(
    activity: Activity,
    outcome: Outcome,
    severity: Severity,
    user_email: Option<&str>,
    message: &str,
) {
    emit(&build_authentication_event(
        activity, outcome, severity, user_email, message,
    ));
}

/// Build an OCSF record of a tier check.
pub fn build_authorization_event(
    path: &str,
    required_tier: &str,
    user_tier: Option<&str>,
    permitted: bool,
    user_email: Option<&str>,
) -> Value {
    let (outcome, severity, decision) = if permitted {
        (Outcome::Success, Severity::Informational, "permit")
    } else {
        (Outcome::Failure, Severity::Medium, "deny")
    };
    let mut event = base_event(
        Activity::Other,
        outcome,
        severity,
        &format!("Tier authorization: {decision} for {path}"),
    );
    event["metadata"]["authorization"] = json!({
        "resource": path,
        "required_tier": required_tier,
        "user_tier": user_tier.unwrap_or(""),
        "decision": decision,
    });
    with_actor(event, user_email)
}

pub fn authorization_event(
    path: &str,
    required_tier: &str,
    user_tier: Option<&str>,
    permitted: bool,
    user_email: Option<&str>,
) {
    emit(&build_authorization_event(
        path,
        required_tier,
        user_tier,
        permitted,
        user_email,
    ));
}

/// Generic audit record for back-office actions. Counted in
/// `audit_logs_total` before it is logged.
pub fn record(metrics: &Metrics, event_type: &str, user_id: &str, resource: &str) {
    metrics.count_audit(event_type, user_id, resource);
    tracing::info!(
        target: "audit",
        event_type,
        user_id,
        resource,
        "audit event"
    );
}

/// A successful state-changing request, as seen by the audit middleware.
#[derive(Debug, Clone)]
pub struct RequestAudit<'a> {
    pub user_id: &'a str,
    pub company_id: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub status: u16,
    pub client_ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

pub fn record_request(entry: &RequestAudit<'_>) {
    tracing::info!(
        target: "audit",
        event_type = "http_request",
        user_id = entry.user_id,
        company_id = entry.company_id,
        method = entry.method,
        path = entry.path,
        status = entry.status,
        client_ip = entry.client_ip.unwrap_or("unknown"),
        user_agent = entry.user_agent.unwrap_or(""),
        "audit event"
    );
}

//! Audit trail for successful state-changing requests.

use axum::extract::Request;
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::audit::{RequestAudit, record_request};
use crate::users::AuthenticatedUser;

fn is_state_changing(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// `X-Real-IP`, else the first hop of `X-Forwarded-For`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// Records the request after the handler runs. Mount inside
/// `require_authenticated` so the user is known.
pub async fn audit_requests(req: Request, next: Next) -> Response {
    if !is_state_changing(req.method()) {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user = req.extensions().get::<AuthenticatedUser>().cloned();
    let ip = client_ip(req.headers());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = next.run(req).await;

    let status = response.status();
    if status.as_u16() < 400
        && let Some(user) = user
    {
        record_request(&RequestAudit {
            user_id: &user.id,
            company_id: &user.company_id,
            method: method.as_str(),
            path: &path,
            status: status.as_u16(),
            client_ip: ip.as_deref(),
            user_agent: user_agent.as_deref(),
        });
    }

    response
}

use http::StatusCode;
use http_body_util::combinators::BoxBody;
use hyper::header::{HeaderName, HeaderValue};
use hyper::Response;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AbuseAction;
use crate::monitor::Verdict;
use crate::proxy::synthetic_response::full_body;
use crate::telemetry::Metrics;

type RespBody = BoxBody<bytes::Bytes, hyper::Error>;

pub const ABUSE_VERDICT_HEADER: &str = "x-abuse-verdict";
pub const ABUSE_REASON_HEADER: &str = "x-abuse-reason";

/// Decide what to do with a request given the monitor's verdict.
///
/// Returns:
/// - `None` if the request may be forwarded
/// - `Some(429 response)` if the requesting client is blamed and the action
///   is to reject
///
/// A periodic verdict that only flags other clients, or only bucket totals,
/// does not block the requester.
pub fn check_abuse(
    verdict: &Verdict,
    client_id: &str,
    action: AbuseAction,
    metrics: Option<&Arc<Metrics>>,
) -> Option<Response<RespBody>> {
    if !verdict.blames(client_id) {
        if verdict.is_abuse() {
            debug!(client = client_id, verdict = verdict.as_str(), "Abuse flagged elsewhere, forwarding");
        }
        return None;
    }

    let reasons = reasons_for(verdict, client_id);
    match action {
        AbuseAction::Log => {
            info!(client = client_id, ?reasons, "Abusive client forwarded (action = log)");
            None
        }
        AbuseAction::Reject => {
            if let Some(m) = metrics {
                m.record_rejection(verdict.as_str());
            }
            Some(create_429_response(verdict.as_str(), &reasons))
        }
    }
}

/// Reasons recorded against `client_id` in `verdict`.
pub fn reasons_for(verdict: &Verdict, client_id: &str) -> Vec<String> {
    match verdict {
        Verdict::NoAbuse => Vec::new(),
        Verdict::ImmediateAbuse(report) => report.reasons.clone(),
        Verdict::PeriodicAbuse(report) => report
            .offenders
            .iter()
            .filter(|o| o.client_id == client_id)
            .flat_map(|o| o.reasons.iter().cloned())
            .collect(),
    }
}

fn create_429_response(verdict: &'static str, reasons: &[String]) -> Response<RespBody> {
    let mut resp = Response::new(full_body("Too Many Requests"));
    *resp.status_mut() = StatusCode::TOO_MANY_REQUESTS;

    resp.headers_mut().insert(
        HeaderName::from_static(ABUSE_VERDICT_HEADER),
        HeaderValue::from_static(verdict),
    );
    for reason in reasons {
        if let Ok(value) = HeaderValue::from_str(reason) {
            resp.headers_mut()
                .append(HeaderName::from_static(ABUSE_REASON_HEADER), value);
        }
    }

    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{AbuseDetectionReport, AbuseReport};
    use crate::stats::ClientStats;

    fn report(client_id: &str, reason: &str) -> AbuseReport {
        AbuseReport {
            client_id: client_id.to_string(),
            reasons: vec![reason.to_string()],
            stats: ClientStats::new(0),
        }
    }

    #[test]
    fn immediate_abuse_is_rejected() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let verdict = Verdict::ImmediateAbuse(report("1.2.3.4", "Ingress exceeded (6 > 5)"));
        let resp = check_abuse(&verdict, "1.2.3.4", AbuseAction::Reject, None)
            .ok_or("expected a 429")?;

        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.headers().get(ABUSE_VERDICT_HEADER).ok_or("missing verdict")?,
            "immediate_abuse"
        );
        assert_eq!(
            resp.headers().get(ABUSE_REASON_HEADER).ok_or("missing reason")?,
            "Ingress exceeded (6 > 5)"
        );
        Ok(())
    }

    #[test]
    fn log_action_forwards() {
        let verdict = Verdict::ImmediateAbuse(report("1.2.3.4", "Egress exceeded (9 > 1)"));
        assert!(check_abuse(&verdict, "1.2.3.4", AbuseAction::Log, None).is_none());
    }

    #[test]
    fn periodic_abuse_only_blocks_offenders() {
        let verdict = Verdict::PeriodicAbuse(AbuseDetectionReport {
            date: "2025-09-04".to_string(),
            offenders: vec![report("a", "Request count exceeded (11 > 10)")],
            warnings: Vec::new(),
            has_abuse: true,
        });

        assert!(check_abuse(&verdict, "a", AbuseAction::Reject, None).is_some());
        assert!(check_abuse(&verdict, "b", AbuseAction::Reject, None).is_none());
        assert_eq!(reasons_for(&verdict, "a"), vec!["Request count exceeded (11 > 10)"]);
        assert!(reasons_for(&verdict, "b").is_empty());
    }

    #[test]
    fn no_abuse_forwards() {
        assert!(check_abuse(&Verdict::NoAbuse, "a", AbuseAction::Reject, None).is_none());
    }
}

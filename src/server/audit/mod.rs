mod client;
mod outcome;
mod record;
mod stream;

pub mod clock;
pub mod config;
pub mod fingerprint;
pub mod query;
pub mod writer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::dev::ServiceRequest;
use actix_web::http::header::{self, HeaderMap};
use anyhow::Result;
use clock::Clock;
use config::AuditConfig;
use writer::{AuditLogger, AuditSink, AuditWorker};

pub use client::ClientInfo;
pub use outcome::{AuthInfo, AuthStatus, AuthorizationInfo, AuthorizationStatus};
pub use record::AuditRecord;
pub use stream::ArchiveName;

use crate::types::identity::IdentityContext;

use super::context::DecisionContext;

/// Opens the stream files under the configured directory and wires the
/// logger to its writer.
pub fn build(cfg: &AuditConfig, clock: Arc<dyn Clock>) -> Result<(AuditLogger, AuditWorker)> {
    let sink = AuditSink::open(&cfg.dir_path, clock, cfg.retention_days)?;
    Ok(writer::create(
        sink,
        cfg.channel_capacity,
        Duration::from_secs(cfg.rotation_check_secs),
        cfg.console_alerts,
    ))
}

/// What is known about a request before it is handled. Turned into an
/// [`AuditRecord`] once the response status is final.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub request_id: String,
    pub timestamp: String,
    pub ip: String,
    pub fingerprint: String,
    pub method: String,
    pub url: String,
    pub client: ClientInfo,
    started: Instant,
}

impl RequestInfo {
    pub fn from_request(req: &ServiceRequest, request_id: String, clock: &dyn Clock) -> Self {
        let headers = req.headers();
        let ip = fingerprint::client_ip(headers, req.peer_addr());
        let user_agent = header_str(headers, header::USER_AGENT);
        let fingerprint = fingerprint::fingerprint(
            &ip,
            user_agent,
            header_str(headers, header::ACCEPT_LANGUAGE),
            header_str(headers, header::ACCEPT_ENCODING),
            header_str(headers, header::ACCEPT),
        );

        let uri = req.uri();
        let url = match uri.path_and_query() {
            Some(pq) => pq.as_str().to_string(),
            None => uri.path().to_string(),
        };

        Self {
            request_id,
            timestamp: AuditRecord::format_timestamp(&clock.now()),
            client: ClientInfo::from_user_agent(user_agent),
            ip,
            fingerprint,
            method: req.method().to_string(),
            url,
            started: Instant::now(),
        }
    }

    pub fn finish(
        self,
        status: u16,
        identity: Option<&IdentityContext>,
        ctx: &DecisionContext,
    ) -> AuditRecord {
        let response_time_ms = self.started.elapsed().as_millis() as u64;
        let authorization = AuthorizationInfo::classify(
            status,
            identity.is_some(),
            ctx.denial_code(),
            ctx.error_message(),
        );
        // Error text is only recorded for failed requests
        let error = if status >= 400 {
            ctx.error_message().map(String::from)
        } else {
            None
        };

        AuditRecord {
            timestamp: self.timestamp,
            request_id: self.request_id,
            fingerprint: self.fingerprint,
            ip: self.ip,
            method: self.method,
            url: self.url,
            status_code: status,
            response_time_ms,
            client: self.client,
            auth: AuthInfo::from_identity(identity),
            authorization,
            security: ctx.security_violation().map(String::from),
            error,
        }
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

use std::sync::Arc;

use actix_web::web::{self, Bytes, Data};
use actix_web::{HttpRequest, HttpResponse};
use log::{debug, error};
use serde::Deserialize;

use crate::server::audit::query::{self, SearchQuery, Stream};
use crate::server::context::DecisionScope;
use crate::server::error::GuardError;
use crate::server::response::Response;
use crate::server::restful::RestfulContext;
use crate::time::parse_time;

use super::{identity_of, reject, screen};

#[derive(Debug, Deserialize)]
pub struct AuditParams {
    pub search: Option<String>,
    #[serde(default)]
    pub stream: Stream,
    pub since: Option<String>,
    pub until: Option<String>,
    pub limit: Option<usize>,
}

const INVALID_PARAMS: &str = "invalid audit query parameters";

impl AuditParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;
}

/// `GET /api/admin/audit`: admin-only search over the audit streams.
pub async fn handle_audit(
    req: HttpRequest,
    body: Option<Bytes>,
    scope: DecisionScope,
    ctx: Data<Arc<RestfulContext>>,
) -> HttpResponse {
    let identity = identity_of(&req);
    if let Some(resp) = screen(&req, body.as_ref(), identity.as_ref(), &scope, &ctx) {
        return resp;
    }

    match identity {
        Some(ref identity) if identity.is_admin() => {}
        Some(_) => return reject(&scope, GuardError::InsufficientPermission),
        None => return reject(&scope, GuardError::Unauthenticated),
    }

    let params = match web::Query::<AuditParams>::from_query(req.query_string()) {
        Ok(params) => params.into_inner(),
        Err(e) => return invalid_params(&scope, format!("parse audit query: {e}")),
    };

    let mut search = SearchQuery {
        text: params.search.filter(|s| !s.is_empty()),
        limit: Some(
            params
                .limit
                .unwrap_or(AuditParams::DEFAULT_LIMIT)
                .min(AuditParams::MAX_LIMIT),
        ),
        ..Default::default()
    };
    for (value, slot) in [
        (params.since, &mut search.since),
        (params.until, &mut search.until),
    ] {
        if let Some(value) = value {
            match parse_time(&value) {
                Ok(time) => *slot = Some(time),
                Err(e) => return invalid_params(&scope, format!("parse audit time range: {e:#}")),
            }
        }
    }

    let dir = ctx.audit_dir.clone();
    let stream = params.stream;
    let result = web::block(move || query::search(&dir, stream, &search)).await;
    match result {
        Ok(Ok(records)) => Response::json(records).into(),
        Ok(Err(e)) => {
            error!("Search audit {} stream failed: {e:#}", stream.file_name());
            reject(&scope, GuardError::InternalValidationError)
        }
        Err(e) => {
            error!("Search audit task failed: {e}");
            reject(&scope, GuardError::InternalValidationError)
        }
    }
}

/// The detail goes to the operator log and the audit record, never to the
/// caller.
fn invalid_params(scope: &DecisionScope, detail: String) -> HttpResponse {
    debug!("Reject audit search: {detail}");
    scope.borrow_mut().set_error(detail);
    Response::bad_request(INVALID_PARAMS).into()
}

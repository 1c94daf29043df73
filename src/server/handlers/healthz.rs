use std::sync::Arc;

use actix_web::web::{Bytes, Data};
use actix_web::{HttpRequest, HttpResponse};

use crate::server::audit::writer::AuditState;
use crate::server::audit::AuditRecord;
use crate::server::context::DecisionScope;
use crate::server::restful::RestfulContext;
use crate::types::response::HealthzResponse;

use super::{identity_of, screen};

/// Public, but screened like every other route.
pub async fn handle(
    req: HttpRequest,
    body: Option<Bytes>,
    scope: DecisionScope,
    ctx: Data<Arc<RestfulContext>>,
) -> HttpResponse {
    let identity = identity_of(&req);
    if let Some(resp) = screen(&req, body.as_ref(), identity.as_ref(), &scope, &ctx) {
        return resp;
    }

    let status = match ctx.audit.state() {
        AuditState::Ready | AuditState::Rotating => "ok",
        AuditState::Uninitialized => "starting",
    };
    let resp = HealthzResponse {
        status: String::from(status),
        now: AuditRecord::format_timestamp(&ctx.clock.now()),
    };
    HttpResponse::Ok().json(resp)
}

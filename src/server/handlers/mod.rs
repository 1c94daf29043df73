pub mod admin;
pub mod healthz;
pub mod resources;

use std::sync::Arc;

use actix_web::web::{Bytes, Data};
use actix_web::{HttpMessage, HttpRequest, HttpResponse};

use crate::types::identity::IdentityContext;

use super::anomaly::RequestView;
use super::context::DecisionScope;
use super::error::GuardError;
use super::response::Response;
use super::restful::RestfulContext;

/// The identity the audit middleware attached to the request, if any.
pub fn identity_of(req: &HttpRequest) -> Option<IdentityContext> {
    req.extensions().get::<IdentityContext>().cloned()
}

/// Runs the anomaly screen over the request. Returns the terminal response if
/// the request is blocked.
pub fn screen(
    req: &HttpRequest,
    body: Option<&Bytes>,
    identity: Option<&IdentityContext>,
    scope: &DecisionScope,
    ctx: &RestfulContext,
) -> Option<HttpResponse> {
    let view = RequestView {
        method: req.method().as_str(),
        path: req.path(),
        query: req.query_string(),
        body: body.map(|b| b.as_ref()),
        identity,
    };
    match ctx.pipeline.screen(&view, scope) {
        Ok(()) => None,
        Err(err) => Some(Response::guard(err).into()),
    }
}

/// Ends the request with `err`, recording it for the audit logger.
pub fn reject(scope: &DecisionScope, err: GuardError) -> HttpResponse {
    scope.borrow_mut().deny(err);
    Response::guard(err).into()
}

pub async fn default_handler(
    req: HttpRequest,
    body: Option<Bytes>,
    scope: DecisionScope,
    ctx: Data<Arc<RestfulContext>>,
) -> HttpResponse {
    let identity = identity_of(&req);
    if let Some(resp) = screen(&req, body.as_ref(), identity.as_ref(), &scope, &ctx) {
        return resp;
    }

    let method = req.method().as_str();
    let path = req.path();
    scope
        .borrow_mut()
        .set_error(format!("No route to {method} {path}"));
    Response::route_not_found(method, path).into()
}

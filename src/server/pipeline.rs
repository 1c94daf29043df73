use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage, ResponseError};
use log::{debug, error, warn};
use uuid::Uuid;

use crate::types::identity::IdentityContext;
use crate::types::resource::ResourceType;

use super::anomaly::{AnomalyDetector, RequestView};
use super::audit::RequestInfo;
use super::authn::AuthnResponse;
use super::authz::ownership::{Ownership, OwnershipValidator};
use super::authz::permission::PermissionEvaluator;
use super::authz::{Action, AuthzResponse};
use super::context::DecisionScope;
use super::error::GuardError;
use super::restful::RestfulContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The guard stages in the order they run for a request: anomaly screen,
/// permission check, ownership check. Every denial is written to the
/// request's decision scope before it is returned.
pub struct Pipeline {
    evaluator: PermissionEvaluator,
    validator: OwnershipValidator,
    detector: AnomalyDetector,
}

impl Pipeline {
    pub fn new(
        evaluator: PermissionEvaluator,
        validator: OwnershipValidator,
        detector: AnomalyDetector,
    ) -> Self {
        Self {
            evaluator,
            validator,
            detector,
        }
    }

    /// Severe patterns block the request with `SECURITY_VIOLATION`; suspicious
    /// ones are recorded and let through.
    pub fn screen(&self, view: &RequestView, scope: &DecisionScope) -> Result<(), GuardError> {
        let scan = self.detector.scan(view);
        if scan.patterns.is_empty() {
            return Ok(());
        }

        let caller = view
            .identity
            .map(|id| id.user_id.as_str())
            .unwrap_or("anonymous");
        for tag in scan.patterns.iter().filter(|tag| tag.is_log_only()) {
            warn!("{tag} by {caller} on {} {}", view.method, view.path);
        }

        if scan.is_severe() {
            let message = format!("Blocked request: {}", scan.describe());
            warn!("{message} from {caller} on {} {}", view.method, view.path);

            let mut ctx = scope.borrow_mut();
            ctx.flag_violation(message);
            ctx.deny(GuardError::SecurityViolation);
            return Err(GuardError::SecurityViolation);
        }

        let recorded = scan.describe();
        if !recorded.is_empty() {
            let message = format!("Suspicious request: {recorded}");
            warn!("{message} from {caller} on {} {}", view.method, view.path);
            scope.borrow_mut().flag_violation(message);
        }
        Ok(())
    }

    /// Permission first, then ownership when the caller's role is limited to
    /// its own instances of `kind` and the request names one.
    pub fn authorize(
        &self,
        identity: Option<&IdentityContext>,
        action: Action,
        kind: ResourceType,
        id: Option<&str>,
        scope: &DecisionScope,
    ) -> Result<(), GuardError> {
        let result = self.evaluate(identity, action, kind, id, scope);
        if let Err(err) = result {
            debug!("Deny {action} on {kind}: {}", err.code());
            scope.borrow_mut().deny(err);
        }
        result
    }

    fn evaluate(
        &self,
        identity: Option<&IdentityContext>,
        action: Action,
        kind: ResourceType,
        id: Option<&str>,
        scope: &DecisionScope,
    ) -> Result<(), GuardError> {
        let identity = match identity {
            Some(identity) => identity,
            None => return Err(GuardError::Unauthenticated),
        };

        if let AuthzResponse::Deny(err) = self.evaluator.check_permission(action, kind, identity) {
            return Err(err);
        }

        let id = match id {
            Some(id) => id,
            None => return Ok(()),
        };
        if !self.evaluator.requires_ownership(kind, identity) {
            return Ok(());
        }

        let ownership =
            self.validator
                .validate_ownership(kind, id, identity, &mut scope.borrow_mut());
        match ownership {
            Ok(Ownership::Allow) => Ok(()),
            Ok(Ownership::NotFound) => Err(GuardError::NotFound),
            Ok(Ownership::Deny { reason }) => {
                warn!("{reason}");
                Err(GuardError::AccessDenied)
            }
            Err(e) => {
                error!("Validate ownership of {kind} '{id}' failed: {e:#}");
                Err(GuardError::InternalValidationError)
            }
        }
    }
}

/// Outermost layer of every request. Authenticates the caller, opens the
/// request's decision scope, and after the response is final emits exactly
/// one audit record.
pub async fn audit_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let ctx = match req.app_data::<Data<Arc<RestfulContext>>>() {
        Some(ctx) => ctx.clone(),
        None => return next.call(req).await,
    };

    let request_id = Uuid::new_v4().to_string();
    let info = RequestInfo::from_request(&req, request_id.clone(), ctx.clock.as_ref());
    let scope = DecisionScope::new();

    let identity = match ctx.authn.authenticate_request(req.request()) {
        Ok(AuthnResponse::Ok(identity)) => Some(identity),
        Ok(AuthnResponse::Anonymous) => None,
        Ok(AuthnResponse::Unauthenticated(reason)) => {
            debug!("Request {request_id} credentials rejected: {reason}");
            scope
                .borrow_mut()
                .set_error(format!("Authentication failed: {reason}"));
            None
        }
        Err(e) => {
            error!("Authenticate request {request_id} failed: {e:#}");
            None
        }
    };

    if let Some(ref identity) = identity {
        req.extensions_mut().insert(identity.clone());
    }
    req.extensions_mut().insert(scope.clone());

    let mut res = match next.call(req).await {
        Ok(res) => res,
        Err(err) => {
            let status = err.as_response_error().status_code().as_u16();
            scope.borrow_mut().set_error(err.to_string());
            let record = info.finish(status, identity.as_ref(), &scope.borrow());
            ctx.audit.record(record);
            return Err(err);
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    let status = res.status().as_u16();
    if status >= 400 && scope.borrow().error_message().is_none() {
        if let Some(err) = res.response().error() {
            scope.borrow_mut().set_error(err.to_string());
        }
    }
    let record = info.finish(status, identity.as_ref(), &scope.borrow());
    ctx.audit.record(record);

    Ok(res)
}

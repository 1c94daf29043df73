use std::sync::Arc;

use actix_web::web::{Bytes, Data};
use actix_web::{HttpRequest, HttpResponse};
use log::error;
use serde::{Deserialize, Serialize};

use crate::server::authz::Action;
use crate::server::context::DecisionScope;
use crate::server::error::GuardError;
use crate::server::response::Response;
use crate::server::restful::RestfulContext;
use crate::types::resource::{Resource, ResourceType};

use super::{identity_of, reject, screen};

/// Body of an allowed write or search. The business handlers behind this
/// service own the actual records.
#[derive(Debug, Serialize, Deserialize)]
pub struct Granted {
    pub action: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// `/api/resources/{kind}[/{id}]`: anomaly screen, then permission and
/// ownership, then the read or the grant.
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

    let kind = match req.match_info().get("kind").map(ResourceType::parse) {
        Some(Ok(kind)) => kind,
        _ => return reject(&scope, GuardError::NotFound),
    };
    let id = req.match_info().get("id").map(String::from);

    let action = match Action::from_method(req.method(), id.is_some()) {
        Some(action) => action,
        None => return Response::method_not_allowed().into(),
    };

    if let Err(err) = ctx
        .pipeline
        .authorize(identity.as_ref(), action, kind, id.as_deref(), &scope)
    {
        return Response::guard(err).into();
    }

    match (action, id) {
        (Action::Read, Some(id)) => read(kind, &id, &scope, &ctx),
        (action, id) => Response::json(Granted {
            action: action.to_string(),
            kind: kind.to_string(),
            id,
        })
        .into(),
    }
}

/// Returns the instance resolved by the ownership check, looking it up only
/// when no check ran.
fn read(kind: ResourceType, id: &str, scope: &DecisionScope, ctx: &RestfulContext) -> HttpResponse {
    let resolved = scope.borrow().resource_data().cloned();
    let resource: Resource = match resolved {
        Some(resource) => resource,
        None => match ctx.registry.resolve(kind, id) {
            Ok(Some(resource)) => resource,
            Ok(None) => return reject(scope, GuardError::NotFound),
            Err(e) => {
                error!("Lookup {kind} '{id}' failed: {e:#}");
                return reject(scope, GuardError::InternalValidationError);
            }
        },
    };
    Response::json(resource).into()
}

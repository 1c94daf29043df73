use std::cell::{Ref, RefCell, RefMut};
use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};

use crate::types::resource::Resource;

use super::error::GuardError;

const VIOLATION_SEPARATOR: &str = "; ";

/// Per-request scratch space shared by the guard stages and read by the audit
/// logger once the response is final.
///
/// Field writers:
/// - `security_violation`: ownership validator and anomaly screen. The value
///   is never cleared; later violations are appended after the first.
/// - `error_message` and `denial_code`: whichever stage terminates the request.
/// - `resource_data`: ownership validator on allow.
#[derive(Debug, Default)]
pub struct DecisionContext {
    security_violation: Option<String>,
    error_message: Option<String>,
    resource_data: Option<Resource>,
    denial_code: Option<&'static str>,
}

impl DecisionContext {
    /// Records a security violation, appending it to any earlier one with
    /// `; `. Returns `false` if the same message was already recorded.
    pub fn flag_violation(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        match self.security_violation {
            None => self.security_violation = Some(message),
            Some(ref mut existing) => {
                if existing.split(VIOLATION_SEPARATOR).any(|m| m == message) {
                    return false;
                }
                existing.push_str(VIOLATION_SEPARATOR);
                existing.push_str(&message);
            }
        }
        true
    }

    pub fn security_violation(&self) -> Option<&str> {
        self.security_violation.as_deref()
    }

    /// Marks the request as terminated by `err`.
    pub fn deny(&mut self, err: GuardError) {
        self.denial_code = Some(err.code());
        self.error_message = Some(err.to_string());
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn denial_code(&self) -> Option<&'static str> {
        self.denial_code
    }

    pub fn attach_resource(&mut self, resource: Resource) {
        self.resource_data = Some(resource);
    }

    pub fn resource_data(&self) -> Option<&Resource> {
        self.resource_data.as_ref()
    }

    pub fn take_resource(&mut self) -> Option<Resource> {
        self.resource_data.take()
    }
}

/// Handle to the request's [`DecisionContext`]. The audit middleware inserts
/// one into the request extensions; handlers extract it as an argument.
///
/// Borrows must never be held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct DecisionScope(Rc<RefCell<DecisionContext>>);

impl DecisionScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, DecisionContext> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, DecisionContext> {
        self.0.borrow_mut()
    }
}

impl FromRequest for DecisionScope {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Outside the audit middleware (e.g. handler unit tests) a detached
        // scope is handed out.
        let scope = req
            .extensions()
            .get::<DecisionScope>()
            .cloned()
            .unwrap_or_default();
        ready(Ok(scope))
    }
}

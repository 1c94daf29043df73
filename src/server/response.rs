use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::{de::DeserializeOwned, Serialize};

use crate::types::response::{CommonResponse, ResourceResponse};

use super::error::GuardError;

/// A wrapper struct for HTTP responses that provides convenient methods
/// for creating common response types
pub struct Response {
    http_response: HttpResponse,
}

impl Response {
    /// Terminal response of a guard stage: generic message plus stable code.
    pub fn guard(err: GuardError) -> Self {
        Self::err_response(err.status(), err.to_string(), err.code())
    }

    pub fn bad_request(message: impl AsRef<str>) -> Self {
        let message = format!("Bad request: {}", message.as_ref());
        Self::err_response(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    pub fn route_not_found(method: &str, path: &str) -> Self {
        let message = format!("No route to {method} {path}");
        Self::err_response(StatusCode::NOT_FOUND, message, "ROUTE_NOT_FOUND")
    }

    pub fn method_not_allowed() -> Self {
        Self::err_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
            "METHOD_NOT_ALLOWED",
        )
    }

    pub fn json<T: Serialize + DeserializeOwned>(data: T) -> Self {
        let resp = ResourceResponse::<T> {
            success: true,
            data: Some(data),
        };
        Self {
            http_response: HttpResponse::Ok().json(resp),
        }
    }

    fn err_response(status: StatusCode, message: String, code: &str) -> Self {
        let resp = CommonResponse {
            success: false,
            message: Some(message),
            code: Some(code.to_string()),
        };
        Self {
            http_response: HttpResponseBuilder::new(status).json(resp),
        }
    }
}

impl From<Response> for HttpResponse {
    fn from(val: Response) -> Self {
        val.http_response
    }
}

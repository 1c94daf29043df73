use actix_web::http::StatusCode;
use thiserror::Error;

/// Terminal outcome of a guard stage. Every variant maps to one HTTP status and
/// one stable machine code; the display text is the generic message returned to
/// the caller and never carries internal detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Resource not found")]
    NotFound,

    #[error("You do not have access to this resource")]
    AccessDenied,

    #[error("Insufficient permissions for this action")]
    InsufficientPermission,

    #[error("Your role is not allowed to perform this action")]
    InvalidRole,

    #[error("Identity verification is required for this action")]
    IdentityVerificationRequired,

    #[error("An address on file is required for this action")]
    AddressRequired,

    #[error("Request blocked by security policy")]
    SecurityViolation,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Unable to validate request")]
    InternalValidationError,
}

impl GuardError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "RESOURCE_NOT_FOUND",
            Self::AccessDenied => "RESOURCE_ACCESS_DENIED",
            Self::InsufficientPermission => "INSUFFICIENT_PERMISSIONS",
            Self::InvalidRole => "INVALID_ROLE",
            Self::IdentityVerificationRequired => "IDENTITY_VERIFICATION_REQUIRED",
            Self::AddressRequired => "ADDRESS_REQUIRED",
            Self::SecurityViolation => "SECURITY_VIOLATION",
            Self::Unauthenticated => "AUTHENTICATION_REQUIRED",
            Self::InternalValidationError => "INTERNAL_VALIDATION_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AccessDenied
            | Self::InsufficientPermission
            | Self::InvalidRole
            | Self::IdentityVerificationRequired => StatusCode::FORBIDDEN,
            Self::AddressRequired | Self::SecurityViolation => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InternalValidationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

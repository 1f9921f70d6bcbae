use hyper::StatusCode;
use serde_json;
use validator::ValidationErrors;

use http::errors::{Codeable, PayloadCarrier};

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Not found")]
    NotFound,
    #[fail(display = "Parse error")]
    Parse,
    #[fail(display = "Validation error")]
    Validate(ValidationErrors),
    #[fail(display = "Onboarding state does not allow the requested transition")]
    InvalidState,
    #[fail(display = "Record was modified concurrently, re-fetch and retry")]
    ConcurrentModification,
    #[fail(display = "Payment provider rejected the credential: {}", _0)]
    PspVerification(String),
    #[fail(display = "Invalid api key")]
    InvalidKey,
    #[fail(display = "Rate limit exceeded, retry after {} ms", retry_after_ms)]
    RateLimitExceeded { retry_after_ms: u64 },
    #[fail(display = "Tenant is not eligible for api keys")]
    TenantNotEligible,
    #[fail(display = "Server is refusing to fullfil the reqeust")]
    Forbidden,
    #[fail(display = "R2D2 connection error")]
    Connection,
    #[fail(display = "Http Client error")]
    HttpClient,
}

impl Error {
    /// Stable tag written into the usage ledger so dashboards can tell
    /// abuse from integration bugs from infrastructure faults.
    pub fn ledger_tag(&self) -> &'static str {
        match *self {
            Error::NotFound => "not_found",
            Error::Parse => "parse",
            Error::Validate(_) => "validation",
            Error::InvalidState => "invalid_state",
            Error::ConcurrentModification => "concurrent_modification",
            Error::PspVerification(_) => "psp_verification",
            Error::InvalidKey => "invalid_key",
            Error::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Error::TenantNotEligible => "tenant_not_eligible",
            Error::Forbidden => "forbidden",
            Error::Connection | Error::HttpClient => "transient_infra",
        }
    }
}

impl Codeable for Error {
    fn code(&self) -> StatusCode {
        match *self {
            Error::NotFound => StatusCode::NotFound,
            Error::Validate(_) => StatusCode::BadRequest,
            Error::Parse => StatusCode::UnprocessableEntity,
            Error::InvalidState | Error::PspVerification(_) => StatusCode::UnprocessableEntity,
            Error::ConcurrentModification => StatusCode::Conflict,
            Error::InvalidKey => StatusCode::Unauthorized,
            Error::RateLimitExceeded { .. } => StatusCode::TooManyRequests,
            Error::Connection | Error::HttpClient => StatusCode::InternalServerError,
            Error::Forbidden | Error::TenantNotEligible => StatusCode::Forbidden,
        }
    }
}

impl PayloadCarrier for Error {
    fn payload(&self) -> Option<serde_json::Value> {
        match *self {
            Error::Validate(ref e) => serde_json::to_value(e.clone()).ok(),
            Error::RateLimitExceeded { retry_after_ms } => Some(json!({ "retry_after_ms": retry_after_ms })),
            _ => None,
        }
    }
}

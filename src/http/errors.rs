//! Mapping of `failure` error chains onto http responses.

use failure::{Context, Error as FailureError, Fail};
use hyper::StatusCode;
use serde_json;

/// An error that knows which http status code it maps to
pub trait Codeable {
    fn code(&self) -> StatusCode;
}

/// An error that can attach a structured payload to the response body
pub trait PayloadCarrier {
    fn payload(&self) -> Option<serde_json::Value>;
}

/// Wire shape of every error response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub status: u16,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

/// Walks the failure chain looking for the first typed app error,
/// either as a bare value or wrapped in a `Context`.
pub fn find_in_chain<E>(err: &FailureError) -> Option<&E>
where
    E: Fail,
{
    err.iter_chain().filter_map(find_in_fail::<E>).next()
}

fn find_in_fail<E>(fail: &Fail) -> Option<&E>
where
    E: Fail,
{
    fail.downcast_ref::<E>()
        .or_else(|| fail.downcast_ref::<Context<E>>().map(|ctx| ctx.get_context()))
}

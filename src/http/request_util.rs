//! Helpers for reading request bodies and serializing service futures
//! into controller responses.

use failure::Error as FailureError;
use failure::Fail;
use futures::future::IntoFuture;
use futures::{Future, Stream};
use hyper;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json;
use uuid::Uuid;

use super::ControllerFuture;
use errors::Error;

/// Reads the whole request body into a string
pub fn read_body(body: hyper::Body) -> Box<Future<Item = String, Error = hyper::Error>> {
    Box::new(body.concat2().map(|chunk| String::from_utf8_lossy(&chunk).to_string()))
}

/// Reads and parses the request body as json
pub fn parse_body<T>(body: hyper::Body) -> Box<Future<Item = T, Error = FailureError>>
where
    T: DeserializeOwned + 'static,
{
    Box::new(
        read_body(body)
            .map_err(|e| e.context(Error::HttpClient).into())
            .and_then(|string| {
                serde_json::from_str::<T>(&string)
                    .map_err(move |e| e.context(format!("Parsing body {} failed", string)).context(Error::Parse).into())
            }),
    )
}

/// Serializes the result of a service future into a json response body
pub fn serialize_future<T, F>(fut: F) -> ControllerFuture
where
    T: Serialize + 'static,
    F: IntoFuture<Item = T, Error = FailureError> + 'static,
{
    Box::new(
        fut.into_future()
            .and_then(|item| serde_json::to_string(&item).map_err(|e| e.context(Error::Parse).into())),
    )
}

/// Correlation token relayed from the upstream portal, or a fresh one
pub fn correlation_token(headers: &hyper::Headers) -> String {
    headers
        .get_raw("Correlation-Token")
        .and_then(|raw| raw.one())
        .map(|bytes| String::from_utf8_lossy(bytes).to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

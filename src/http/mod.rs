//! Http layer of the app: the hyper `Service` wrapper, the retrying
//! client, route parsing and request/response helpers. The `Controller`
//! only deals with parsed routes and futures of serializable values;
//! everything wire-related lives here.

pub mod client;
pub mod errors;
pub mod request_util;
pub mod router;

use std::marker::PhantomData;

use failure::{Error as FailureError, Fail};
use futures::future;
use futures::Future;
use hyper;
use hyper::header::{ContentLength, ContentType};
use hyper::server::{Request, Response, Service};
use hyper::StatusCode;
use serde_json;

use self::errors::{find_in_chain, Codeable, ErrorMessage, PayloadCarrier};

/// Future that controllers return - a serialized response body
pub type ControllerFuture = Box<Future<Item = String, Error = FailureError>>;

/// Controller handles route parsing and calling the `Service` layer
pub trait Controller {
    fn call(&self, request: Request) -> ControllerFuture;
}

/// Application wraps a `Controller` into a hyper `Service`, turning
/// failure chains into json error responses by locating the app error
/// type `E` in the chain.
pub struct Application<E> {
    controller: Box<Controller>,
    _error_type: PhantomData<E>,
}

impl<E> Application<E>
where
    E: Fail + Codeable + PayloadCarrier,
{
    pub fn new<C>(controller: C) -> Self
    where
        C: Controller + 'static,
    {
        Self {
            controller: Box::new(controller),
            _error_type: PhantomData,
        }
    }

    fn response_with_body(body: String, status: StatusCode) -> Response {
        Response::new()
            .with_status(status)
            .with_header(ContentLength(body.len() as u64))
            .with_header(ContentType::json())
            .with_body(body)
    }

    fn response_with_error(err: &FailureError) -> Response {
        let (status, message, payload) = match find_in_chain::<E>(err) {
            Some(e) => (e.code(), format!("{}", e), e.payload()),
            None => (StatusCode::InternalServerError, "Internal server error".to_string(), None),
        };

        if status == StatusCode::InternalServerError {
            error!("Error occurred: {}", err);
        } else {
            debug!("Error occurred: {}", err);
        }

        let error_message = ErrorMessage {
            status: status.as_u16(),
            message,
            payload,
        };
        let body = serde_json::to_string(&error_message).unwrap_or_default();
        Self::response_with_body(body, status)
    }
}

impl<E> Service for Application<E>
where
    E: Fail + Codeable + PayloadCarrier,
{
    type Request = Request;
    type Response = Response;
    type Error = hyper::Error;
    type Future = Box<Future<Item = Response, Error = hyper::Error>>;

    fn call(&self, req: Request) -> Self::Future {
        Box::new(self.controller.call(req).then(|res| match res {
            Ok(body) => future::ok(Self::response_with_body(body, StatusCode::Ok)),
            Err(err) => future::ok(Self::response_with_error(&err)),
        }))
    }
}

use failure::{Backtrace, Context, Fail};
use std::fmt;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[derive(Clone, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "psp client error - network failure")]
    Network,
    #[fail(display = "psp client error - verification timed out")]
    Timeout,
    #[fail(display = "psp client error - malformed provider response")]
    MalformedResponse,
    #[fail(display = "psp client error - internal error")]
    Internal,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "psp client source - http client")]
    HttpClient,
    #[fail(display = "psp client source - serde_json")]
    SerdeJson,
}

derive_error_impls!();

//! Buffered http client on top of hyper. Requests are pushed through a
//! channel and driven on the reactor by the stream returned from
//! `Client::stream`, so any thread holding a `ClientHandle` can issue
//! requests. Transient network failures are retried a bounded number of
//! times; response verdicts (any http status) are never retried.

use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{self, Either};
use futures::sync::{mpsc, oneshot};
use futures::{Future, Sink, Stream};
use hyper;
use hyper::client::HttpConnector;
use hyper::{Headers, Method, StatusCode};
use hyper_tls::HttpsConnector;
use serde::de::DeserializeOwned;
use serde_json;
use tokio_core::reactor::{Handle, Timeout};

/// Client settings, mirrored from the `client` config section
#[derive(Clone, Debug)]
pub struct Config {
    pub http_client_retries: usize,
    pub http_client_buffer_size: usize,
    pub timeout_duration_ms: u64,
}

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "http client error - network failure: {}", _0)]
    Network(String),
    #[fail(display = "http client error - timed out after {} ms", _0)]
    Timeout(u64),
    #[fail(display = "http client error - could not parse response body")]
    Parse,
    #[fail(display = "http client error - unexpected response status {}: {}", status, body)]
    UnexpectedStatus { status: u16, body: String },
    #[fail(display = "http client error - request channel closed")]
    ChannelClosed,
}

/// Raw response: status plus the fully read body
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
}

struct Payload {
    method: Method,
    url: String,
    body: Option<String>,
    headers: Option<Headers>,
    callback: oneshot::Sender<Result<Response, Error>>,
}

pub trait HttpClient: Send + Sync + 'static {
    fn request(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
    ) -> Box<Future<Item = Response, Error = Error> + Send>;

    fn request_json<T>(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
    ) -> Box<Future<Item = T, Error = Error> + Send>
    where
        T: DeserializeOwned + Send + 'static,
        Self: Sized,
    {
        Box::new(self.request(method, url, body, headers).and_then(|response| {
            if response.status.is_success() {
                serde_json::from_str::<T>(&response.body).map_err(|_| Error::Parse)
            } else {
                Err(Error::UnexpectedStatus {
                    status: response.status.as_u16(),
                    body: response.body,
                })
            }
        }))
    }
}

pub struct Client {
    client: Rc<hyper::Client<HttpsConnector<HttpConnector>>>,
    handle: Handle,
    tx: mpsc::Sender<Payload>,
    rx: mpsc::Receiver<Payload>,
    max_retries: usize,
    timeout_duration_ms: u64,
}

impl Client {
    pub fn new(config: &Config, handle: &Handle) -> Self {
        let connector = HttpsConnector::new(4, handle).expect("Failed to create https connector");
        let client = hyper::Client::configure().connector(connector).build(handle);
        let (tx, rx) = mpsc::channel::<Payload>(config.http_client_buffer_size);
        Self {
            client: Rc::new(client),
            handle: handle.clone(),
            tx,
            rx,
            max_retries: config.http_client_retries,
            timeout_duration_ms: config.timeout_duration_ms,
        }
    }

    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            tx: Arc::new(Mutex::new(self.tx.clone())),
        }
    }

    /// The stream driving queued requests; must be spawned on the reactor
    pub fn stream(self) -> Box<Stream<Item = (), Error = ()>> {
        let Client {
            client,
            handle,
            rx,
            max_retries,
            timeout_duration_ms,
            ..
        } = self;

        Box::new(rx.map(move |payload| {
            let Payload {
                method,
                url,
                body,
                headers,
                callback,
            } = payload;

            let fut = Self::send_with_retries(
                client.clone(),
                handle.clone(),
                method,
                url,
                body,
                headers,
                max_retries,
                timeout_duration_ms,
            ).then(move |result| {
                let _ = callback.send(result);
                Ok::<(), ()>(())
            });

            handle.spawn(fut);
        }))
    }

    fn send_with_retries(
        client: Rc<hyper::Client<HttpsConnector<HttpConnector>>>,
        handle: Handle,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
        attempts_left: usize,
        timeout_duration_ms: u64,
    ) -> Box<Future<Item = Response, Error = Error>> {
        let first_attempt = Self::send_once(
            client.clone(),
            handle.clone(),
            method.clone(),
            url.clone(),
            body.clone(),
            headers.clone(),
            timeout_duration_ms,
        );

        Box::new(first_attempt.or_else(move |err| -> Box<Future<Item = Response, Error = Error>> {
            match err {
                Error::Network(cause) if attempts_left > 0 => {
                    warn!(
                        "Retrying {} {} after network error: {} ({} attempts left)",
                        method, url, cause, attempts_left
                    );
                    Self::send_with_retries(
                        client,
                        handle,
                        method,
                        url,
                        body,
                        headers,
                        attempts_left - 1,
                        timeout_duration_ms,
                    )
                }
                other => Box::new(future::err(other)),
            }
        }))
    }

    fn send_once(
        client: Rc<hyper::Client<HttpsConnector<HttpConnector>>>,
        handle: Handle,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
        timeout_duration_ms: u64,
    ) -> Box<Future<Item = Response, Error = Error>> {
        let uri = match url.parse::<hyper::Uri>() {
            Ok(uri) => uri,
            Err(e) => return Box::new(future::err(Error::Network(format!("invalid url {}: {}", url, e)))),
        };

        let mut req = hyper::Request::new(method, uri);
        if let Some(headers) = headers {
            for header in headers.iter() {
                req.headers_mut().set_raw(header.name().to_owned(), header.value_string());
            }
        }
        if let Some(body) = body {
            req.set_body(body);
        }

        let request_fut = client
            .request(req)
            .and_then(|resp| {
                let status = resp.status();
                resp.body().concat2().map(move |chunk| (status, chunk))
            })
            .map(|(status, chunk)| Response {
                status,
                body: String::from_utf8_lossy(&chunk).to_string(),
            })
            .map_err(|e| Error::Network(format!("{}", e)));

        let timeout = match Timeout::new(Duration::from_millis(timeout_duration_ms), &handle) {
            Ok(timeout) => timeout.map_err(|e| Error::Network(format!("timer error: {}", e))),
            Err(e) => return Box::new(future::err(Error::Network(format!("timer error: {}", e)))),
        };

        Box::new(request_fut.select2(timeout).then(move |res| match res {
            Ok(Either::A((response, _))) => Ok(response),
            Ok(Either::B((_, _))) => Err(Error::Timeout(timeout_duration_ms)),
            Err(Either::A((e, _))) => Err(e),
            Err(Either::B((e, _))) => Err(e),
        }))
    }
}

/// Cloneable, thread safe handle pushing requests into the client stream
#[derive(Clone)]
pub struct ClientHandle {
    tx: Arc<Mutex<mpsc::Sender<Payload>>>,
}

impl HttpClient for ClientHandle {
    fn request(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        headers: Option<Headers>,
    ) -> Box<Future<Item = Response, Error = Error> + Send> {
        let (callback, rx) = oneshot::channel::<Result<Response, Error>>();
        let payload = Payload {
            method,
            url,
            body,
            headers,
            callback,
        };

        let sender = self.tx.lock().unwrap().clone();
        Box::new(
            sender
                .send(payload)
                .map_err(|_| Error::ChannelClosed)
                .and_then(|_| rx.map_err(|_| Error::ChannelClosed).and_then(|result| result)),
        )
    }
}

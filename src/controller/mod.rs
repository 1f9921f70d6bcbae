//! `Controller` is a top layer that handles all http-related
//! stuff like reading bodies, parsing params, forming a response.
//! It is also the authorization gateway: every key-holder route goes
//! authenticate -> rate limit -> usage record -> handler, and every
//! rejection on that path is ledgered with its error kind.

pub mod context;
pub mod responses;
pub mod routes;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use futures::future;
use futures::Future;
use hyper::header::{Authorization, Bearer};
use hyper::server::Request;
use hyper::{Delete, Get, Post};
use r2d2::ManageConnection;

use self::context::{DynamicContext, StaticContext};
use self::responses::ApiKeyResponse;
use self::routes::Route;
use errors::Error;
use failure::Error as FailureError;
use failure::Fail;
use http::errors::find_in_chain;
use http::request_util::{correlation_token, parse_body, serialize_future};
use http::{Controller, ControllerFuture};
use models::*;
use repos::repo_factory::*;
use services::{AgentsService, ApiKeysService, OnboardingService, Service, UsageService, UserRolesService};

/// Controller handles route parsing and calling `Service` layer
pub struct ControllerImpl<T, M, F>
where
    T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
    M: ManageConnection<Connection = T>,
    F: ReposFactory<T>,
{
    pub static_context: StaticContext<T, M, F>,
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > ControllerImpl<T, M, F>
{
    /// Create a new controller based on services
    pub fn new(static_context: StaticContext<T, M, F>) -> Self {
        Self { static_context }
    }

    /// The gateway path for key-holder routes: authenticate the bearer
    /// secret, charge the tenant's bucket, run the handler with an
    /// immutable tenant context, and ledger the outcome either way.
    /// Usage writes are fire-and-forget and never fail the request.
    fn key_holder_call<H>(&self, bearer: Option<String>, endpoint: &'static str, correlation_token: String, handler: H) -> ControllerFuture
    where
        H: FnOnce(TenantContext, Service<T, M, F>) -> ControllerFuture + 'static,
    {
        let started_at = Instant::now();
        let static_context = self.static_context.clone();
        let recorder = Service::new(
            static_context.clone(),
            DynamicContext::new(None, None, correlation_token.clone()),
        );

        let bearer = match bearer {
            Some(bearer) => bearer,
            None => {
                recorder.record_detached(NewUsageRecord::error(None, endpoint, Error::InvalidKey.ledger_tag(), 0));
                return Box::new(future::err(
                    Error::InvalidKey
                        .context("Api keys are accepted in the Authorization header only")
                        .into(),
                ));
            }
        };

        let auth_service = Service::new(
            static_context.clone(),
            DynamicContext::new(None, None, correlation_token.clone()),
        );
        let rate_limiter = static_context.rate_limiter.clone();
        let observed_tenant: Rc<RefCell<Option<TenantId>>> = Rc::new(RefCell::new(None));

        let fut = auth_service
            .authenticate(bearer)
            .and_then({
                let observed_tenant = observed_tenant.clone();
                move |tenant_context| {
                    *observed_tenant.borrow_mut() = Some(tenant_context.tenant_id.clone());
                    rate_limiter
                        .admit(tenant_context.tenant_id.clone(), tenant_context.tenant_kind, 1)
                        .map(move |_| tenant_context)
                }
            })
            .and_then(move |tenant_context| {
                let service = Service::new(
                    static_context,
                    DynamicContext::new(None, Some(tenant_context.clone()), correlation_token),
                );
                handler(tenant_context, service)
            })
            .then(move |result| {
                let elapsed = started_at.elapsed();
                let latency_ms = (elapsed.as_secs() * 1000 + u64::from(elapsed.subsec_millis())) as i32;
                let tenant = observed_tenant.borrow();

                let record = match result {
                    Ok(_) => {
                        // a successful handler implies an authenticated tenant
                        match tenant.as_ref() {
                            Some(tenant_id) => NewUsageRecord::success(tenant_id, endpoint, latency_ms),
                            None => NewUsageRecord::error(None, endpoint, "unattributed_success", latency_ms),
                        }
                    }
                    Err(ref e) => {
                        let error_kind = find_in_chain::<Error>(e).map(Error::ledger_tag).unwrap_or("internal");
                        NewUsageRecord::error(tenant.as_ref(), endpoint, error_kind, latency_ms)
                    }
                };
                recorder.record_detached(record);

                result
            });

        Box::new(fut)
    }
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > Controller for ControllerImpl<T, M, F>
{
    /// Handle a request and get future response
    fn call(&self, req: Request) -> ControllerFuture {
        let headers = req.headers().clone();
        let bearer = headers.get::<Authorization<Bearer>>().map(|auth| auth.0.token.clone());
        let user_id = headers
            .get::<Authorization<String>>()
            .and_then(|auth| auth.0.parse::<i32>().ok())
            .map(UserId);
        let correlation = correlation_token(&headers);

        let service = Service::new(
            self.static_context.clone(),
            DynamicContext::new(user_id, None, correlation.clone()),
        );

        let path = req.path().to_string();

        match (&req.method().clone(), self.static_context.route_parser.test(req.path())) {
            // merchant portal control plane
            (&Post, Some(Route::Merchants)) => serialize_future({
                parse_body::<NewMerchantPayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to register merchant '{}'", payload.legal_name);
                    service.submit_registration(payload)
                })
            }),
            (Get, Some(Route::Merchant { merchant_id })) => {
                debug!("Received request to get merchant {}", merchant_id);
                serialize_future(service.get_merchant(merchant_id))
            }
            (Delete, Some(Route::Merchant { merchant_id })) => {
                debug!("Received request to delete merchant {}", merchant_id);
                serialize_future(service.delete(merchant_id))
            }
            (&Post, Some(Route::MerchantDocuments { merchant_id })) => serialize_future({
                parse_body::<UploadDocumentPayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to upload document for merchant {}", merchant_id);
                    service.upload_document(merchant_id, payload)
                })
            }),
            (&Post, Some(Route::MerchantReview { merchant_id })) => serialize_future({
                parse_body::<ReviewPayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to review merchant {}", merchant_id);
                    service.review(merchant_id, payload)
                })
            }),
            (&Post, Some(Route::MerchantReset { merchant_id })) => {
                debug!("Received request to reset merchant {}", merchant_id);
                serialize_future(service.reset(merchant_id))
            }
            (&Post, Some(Route::MerchantPsp { merchant_id })) => serialize_future({
                parse_body::<ConnectPspPayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to connect psp for merchant {}", merchant_id);
                    service.connect_psp(merchant_id, payload)
                })
            }),

            // agent portal
            (&Post, Some(Route::AgentSessions)) => serialize_future({
                parse_body::<AgentSignInPayload>(req.body()).and_then(move |payload| {
                    debug!("Received request to sign in an agent");
                    service.sign_in(payload)
                })
            }),

            // employee analytics
            (Get, Some(Route::AnalyticsFunnel)) => {
                debug!("Received request to get the onboarding funnel");
                serialize_future(service.funnel())
            }

            // key-holder data plane
            (&Post, Some(route @ Route::Authorize)) => self.key_holder_call(bearer, route.endpoint_tag(), correlation, |tenant_context, _| {
                serialize_future(future::ok::<TenantContext, FailureError>(tenant_context))
            }),
            (&Post, Some(route @ Route::KeysRotate)) => self.key_holder_call(bearer, route.endpoint_tag(), correlation, |tenant_context, service| {
                serialize_future(service.rotate(tenant_context.tenant_id))
            }),
            (Delete, Some(Route::KeyById { key_id })) => {
                self.key_holder_call(bearer, Route::KeyById { key_id: key_id.clone() }.endpoint_tag(), correlation, move |_, service| {
                    serialize_future(service.revoke(key_id).map(ApiKeyResponse::from))
                })
            }
            (Get, Some(route @ Route::UsageSummary)) => self.key_holder_call(bearer, route.endpoint_tag(), correlation, |tenant_context, service| {
                serialize_future(service.summary(tenant_context.tenant_id))
            }),
            (Get, Some(route @ Route::UsageTimeline)) => self.key_holder_call(bearer, route.endpoint_tag(), correlation, |tenant_context, service| {
                serialize_future(service.timeline(tenant_context.tenant_id))
            }),

            // employee role management
            (Get, Some(Route::RolesByUserId { user_id })) => {
                debug!("Received request to get roles by user id {}", user_id);
                serialize_future(service.get_roles(user_id))
            }
            (Post, Some(Route::Roles)) => serialize_future({
                parse_body::<NewUserRole>(req.body()).and_then(move |data| {
                    debug!("Received request to create role {:?}", data);
                    service.create_user_role(data)
                })
            }),
            (Delete, Some(Route::RolesByUserId { user_id })) => {
                debug!("Received request to delete role by user id {}", user_id);
                serialize_future(service.delete_user_role_by_user_id(user_id))
            }
            (Delete, Some(Route::RoleById { id })) => {
                debug!("Received request to delete role by id {}", id);
                serialize_future(service.delete_user_role_by_id(id))
            }

            // Fallback
            (m, _) => Box::new(future::err(
                format_err!("Request to non existing endpoint in authorization microservice! {:?} {:?}", m, path)
                    .context(Error::NotFound)
                    .into(),
            )),
        }
    }
}

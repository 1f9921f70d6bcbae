use http::router::RouteParser;
use models::{ApiKeyId, MerchantId, RoleId, UserId};

/// List of all routes with params for the app
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    Merchants,
    Merchant { merchant_id: MerchantId },
    MerchantDocuments { merchant_id: MerchantId },
    MerchantReview { merchant_id: MerchantId },
    MerchantReset { merchant_id: MerchantId },
    MerchantPsp { merchant_id: MerchantId },
    AgentSessions,
    Authorize,
    KeysRotate,
    KeyById { key_id: ApiKeyId },
    UsageSummary,
    UsageTimeline,
    AnalyticsFunnel,
    Roles,
    RoleById { id: RoleId },
    RolesByUserId { user_id: UserId },
}

impl Route {
    /// Ledger endpoint tag for key-holder routes
    pub fn endpoint_tag(&self) -> &'static str {
        match *self {
            Route::Authorize => "authorize",
            Route::KeysRotate => "keys.rotate",
            Route::KeyById { .. } => "keys.revoke",
            Route::UsageSummary => "usage.summary",
            Route::UsageTimeline => "usage.timeline",
            _ => "portal",
        }
    }
}

pub fn create_route_parser() -> RouteParser<Route> {
    let mut route_parser = RouteParser::default();

    route_parser.add_route(r"^/merchants$", || Route::Merchants);
    route_parser.add_route_with_params(r"^/merchants/(merch_[0-9a-f]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|merchant_id| Route::Merchant { merchant_id })
    });
    route_parser.add_route_with_params(r"^/merchants/(merch_[0-9a-f]+)/documents$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|merchant_id| Route::MerchantDocuments { merchant_id })
    });
    route_parser.add_route_with_params(r"^/merchants/(merch_[0-9a-f]+)/review$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|merchant_id| Route::MerchantReview { merchant_id })
    });
    route_parser.add_route_with_params(r"^/merchants/(merch_[0-9a-f]+)/reset$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|merchant_id| Route::MerchantReset { merchant_id })
    });
    route_parser.add_route_with_params(r"^/merchants/(merch_[0-9a-f]+)/psp$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|merchant_id| Route::MerchantPsp { merchant_id })
    });

    route_parser.add_route(r"^/agents/sessions$", || Route::AgentSessions);

    route_parser.add_route(r"^/authorize$", || Route::Authorize);
    route_parser.add_route(r"^/keys/rotate$", || Route::KeysRotate);
    route_parser.add_route_with_params(r"^/keys/(key_[0-9a-f]+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|key_id| Route::KeyById { key_id })
    });
    route_parser.add_route(r"^/usage/summary$", || Route::UsageSummary);
    route_parser.add_route(r"^/usage/timeline$", || Route::UsageTimeline);
    route_parser.add_route(r"^/analytics/funnel$", || Route::AnalyticsFunnel);

    route_parser.add_route(r"^/roles$", || Route::Roles);
    route_parser.add_route_with_params(r"^/roles/by-user-id/(\d+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|user_id| Route::RolesByUserId { user_id })
    });
    route_parser.add_route_with_params(r"^/roles/by-id/(\S+)$", |params| {
        params
            .get(0)
            .and_then(|string_id| string_id.parse().ok())
            .map(|id| Route::RoleById { id })
    });

    route_parser
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_merchant_routes() {
        let parser = create_route_parser();
        let merchant_id: MerchantId = "merch_0a1b2c3d".parse().unwrap();

        assert_eq!(parser.test("/merchants"), Some(Route::Merchants));
        assert_eq!(
            parser.test("/merchants/merch_0a1b2c3d"),
            Some(Route::Merchant {
                merchant_id: merchant_id.clone()
            })
        );
        assert_eq!(
            parser.test("/merchants/merch_0a1b2c3d/psp"),
            Some(Route::MerchantPsp { merchant_id })
        );
        assert_eq!(parser.test("/merchants/bogus_id"), None);
    }

    #[test]
    fn parses_key_holder_routes() {
        let parser = create_route_parser();

        assert_eq!(parser.test("/authorize"), Some(Route::Authorize));
        assert_eq!(parser.test("/keys/rotate"), Some(Route::KeysRotate));
        assert_eq!(parser.test("/usage/summary"), Some(Route::UsageSummary));
        let key_id: ApiKeyId = "key_0a1b2c3d".parse().unwrap();
        assert_eq!(parser.test("/keys/key_0a1b2c3d"), Some(Route::KeyById { key_id }));
    }
}

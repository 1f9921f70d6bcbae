use models::PspProvider;

/// Normalized verdict of a provider's read-only credential check
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub scopes: Vec<String>,
    /// Provider supplied reason when the credential was rejected
    pub reason: Option<String>,
}

impl VerificationOutcome {
    pub fn valid(scopes: Vec<String>) -> Self {
        VerificationOutcome {
            valid: true,
            scopes,
            reason: None,
        }
    }

    pub fn invalid(reason: String) -> Self {
        VerificationOutcome {
            valid: false,
            scopes: vec![],
            reason: Some(reason),
        }
    }
}

/// Wire shape some providers return for credential introspection;
/// anything beyond `scopes` is ignored
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderCheckResponse {
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Scopes assumed when a provider confirms the credential but does not
/// enumerate grants in the response body
pub fn default_scopes(provider: PspProvider) -> Vec<String> {
    let scopes: &[&str] = match provider {
        PspProvider::Stripe => &["charges:read", "charges:write"],
        PspProvider::Paypal => &["payments:read", "payments:write"],
    };
    scopes.iter().map(|s| s.to_string()).collect()
}

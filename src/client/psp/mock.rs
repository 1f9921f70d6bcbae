use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::{future, Future};

use super::error::*;
use super::types::*;
use super::PspVerifier;
use models::{PspCredential, PspProvider};

/// Credential value the mock treats as a provider outage
pub const UNREACHABLE_CREDENTIAL: &str = "sk_test_unreachable";

#[derive(Clone, Default)]
struct State {
    valid: HashSet<(PspProvider, String)>,
}

/// Deterministic in-memory verifier: only seeded credentials verify,
/// everything else is rejected, and one marker value simulates a
/// provider outage.
#[derive(Clone, Default)]
pub struct MockPspVerifier {
    state: Arc<Mutex<State>>,
}

impl MockPspVerifier {
    pub fn with_valid(provider: PspProvider, credential: &str) -> Self {
        let mock = MockPspVerifier::default();
        mock.add_valid(provider, credential);
        mock
    }

    pub fn add_valid(&self, provider: PspProvider, credential: &str) {
        let mut state = self.state.lock().unwrap();
        state.valid.insert((provider, credential.to_string()));
    }
}

impl PspVerifier for MockPspVerifier {
    fn verify(&self, provider: PspProvider, credential: PspCredential) -> Box<Future<Item = VerificationOutcome, Error = Error> + Send> {
        if credential.expose() == UNREACHABLE_CREDENTIAL {
            return Box::new(future::err(ErrorKind::Network.into()));
        }

        let state = self.state.lock().unwrap();
        let outcome = if state.valid.contains(&(provider, credential.expose().to_string())) {
            VerificationOutcome::valid(default_scopes(provider))
        } else {
            VerificationOutcome::invalid(format!("{} rejected the credential", provider))
        };

        Box::new(future::ok(outcome))
    }
}

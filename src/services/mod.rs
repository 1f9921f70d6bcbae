//! Services is a core layer for the app business logic like
//! validation, authorization, etc.

pub mod agents;
pub mod api_keys;
pub mod onboarding;
pub mod types;
pub mod usage;
pub mod user_roles;

pub use self::agents::AgentsService;
pub use self::api_keys::ApiKeysService;
pub use self::onboarding::OnboardingService;
pub use self::types::{Service, ServiceFuture};
pub use self::usage::UsageService;
pub use self::user_roles::UserRolesService;

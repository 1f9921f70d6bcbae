//! Repos is a module responsible for interacting with postgres db

#[macro_use]
pub mod acl;
pub mod agents;
pub mod api_keys;
pub mod documents;
pub mod legacy_acl;
pub mod merchants;
pub mod repo_factory;
pub mod types;
pub mod usage_records;
pub mod user_roles;

pub use self::acl::*;
pub use self::agents::*;
pub use self::api_keys::*;
pub use self::documents::*;
pub use self::merchants::*;
pub use self::repo_factory::*;
pub use self::types::*;
pub use self::usage_records::*;
pub use self::user_roles::*;

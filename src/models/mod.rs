//! Models contains all structures that are used in different
//! modules of the app

pub mod agent;
pub mod api_key;
pub mod authorization;
pub mod document;
pub mod merchant;
pub mod psp;
pub mod tenant;
pub mod usage_record;
pub mod user_role;

pub use self::agent::*;
pub use self::api_key::*;
pub use self::authorization::*;
pub use self::document::*;
pub use self::merchant::*;
pub use self::psp::*;
pub use self::tenant::*;
pub use self::usage_record::*;
pub use self::user_role::*;

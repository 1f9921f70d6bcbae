//! Enum for resources available in ACLs
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resource {
    Merchant,
    MerchantDocument,
    Agent,
    ApiKey,
    UsageRecord,
    UserRoles,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Resource::Merchant => write!(f, "merchant"),
            Resource::MerchantDocument => write!(f, "merchant document"),
            Resource::Agent => write!(f, "agent"),
            Resource::ApiKey => write!(f, "api key"),
            Resource::UsageRecord => write!(f, "usage record"),
            Resource::UserRoles => write!(f, "user roles"),
        }
    }
}

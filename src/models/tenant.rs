//! The tenant abstraction: the unit of authorization and rate limiting.
//! A tenant is either a merchant or an agent; the id wire format is the
//! prefixed string of the underlying account id.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::de::{self, Deserialize as DeserializeTrait, Deserializer};
use serde::ser::{Serialize as SerializeTrait, Serializer};

use models::{AgentId, MerchantId};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TenantId {
    Merchant(MerchantId),
    Agent(AgentId),
}

impl TenantId {
    pub fn kind(&self) -> TenantKind {
        match *self {
            TenantId::Merchant(_) => TenantKind::Merchant,
            TenantId::Agent(_) => TenantKind::Agent,
        }
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TenantId::Merchant(ref id) => Display::fmt(id, f),
            TenantId::Agent(ref id) => Display::fmt(id, f),
        }
    }
}

impl FromStr for TenantId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<MerchantId>()
            .map(TenantId::Merchant)
            .or_else(|_| s.parse::<AgentId>().map(TenantId::Agent))
    }
}

impl SerializeTrait for TenantId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> DeserializeTrait<'de> for TenantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value
            .parse()
            .map_err(|_| de::Error::custom(format!("unrecognized tenant id: {}", value)))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TenantKind {
    Merchant,
    Agent,
}

impl TenantKind {
    /// Capability set granted to keys of this tenant class
    pub fn scopes(&self) -> Vec<String> {
        let scopes: &[&str] = match *self {
            TenantKind::Merchant => &["charges:create", "keys:rotate", "usage:read"],
            TenantKind::Agent => &["agent:act", "keys:rotate", "usage:read"],
        };
        scopes.iter().map(|s| s.to_string()).collect()
    }
}

impl Display for TenantKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TenantKind::Merchant => write!(f, "merchant"),
            TenantKind::Agent => write!(f, "agent"),
        }
    }
}

/// Immutable context describing the authenticated caller; built by the
/// gateway once per request and passed explicitly to handlers
#[derive(Clone, Debug, Serialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub tenant_kind: TenantKind,
    pub scopes: Vec<String>,
    /// Set when authentication went through the deprecated legacy token
    /// path so callers can warn the integrator
    pub legacy: bool,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        let tenant_kind = tenant_id.kind();
        Self {
            tenant_id,
            tenant_kind,
            scopes: tenant_kind.scopes(),
            legacy: false,
        }
    }

    pub fn legacy(tenant_id: TenantId) -> Self {
        Self {
            legacy: true,
            ..Self::new(tenant_id)
        }
    }
}

mod diesel_impl {
    use std::error::Error;
    use std::io::Write;
    use std::str;
    use std::str::FromStr;

    use diesel::deserialize::Queryable;
    use diesel::expression::bound::Bound;
    use diesel::expression::AsExpression;
    use diesel::pg::Pg;
    use diesel::row::Row;
    use diesel::serialize::Output;
    use diesel::sql_types::VarChar;
    use diesel::types::{FromSqlRow, IsNull, NotNull, SingleValue, ToSql};

    use super::TenantId;

    impl NotNull for TenantId {}
    impl SingleValue for TenantId {}

    impl FromSqlRow<VarChar, Pg> for TenantId {
        fn build_from_row<R: Row<Pg>>(row: &mut R) -> Result<Self, Box<Error + Send + Sync>> {
            match row.take() {
                Some(value) => {
                    let value = str::from_utf8(value).map_err(|_| "Unreadable value for TenantId")?;
                    TenantId::from_str(value).map_err(|_| format!("Unrecognized tenant id: {}", value).into())
                }
                None => Err("Unexpected null for non-null column `tenant_id`".into()),
            }
        }
    }

    impl Queryable<VarChar, Pg> for TenantId {
        type Row = TenantId;
        fn build(row: Self::Row) -> Self {
            row
        }
    }

    impl ToSql<VarChar, Pg> for TenantId {
        fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> Result<IsNull, Box<Error + Send + Sync>> {
            out.write_all(self.to_string().as_bytes())?;
            Ok(IsNull::No)
        }
    }

    impl AsExpression<VarChar> for TenantId {
        type Expression = Bound<VarChar, TenantId>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }

    impl<'a> AsExpression<VarChar> for &'a TenantId {
        type Expression = Bound<VarChar, &'a TenantId>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_parses_by_prefix() {
        let merchant: TenantId = "merch_0a1b2c".parse().unwrap();
        assert_eq!(merchant.kind(), TenantKind::Merchant);

        let agent: TenantId = "agent_0a1b2c".parse().unwrap();
        assert_eq!(agent.kind(), TenantKind::Agent);

        assert!("user_42".parse::<TenantId>().is_err());
    }

    #[test]
    fn tenant_id_display_roundtrips() {
        let id = TenantId::Merchant(MerchantId::new());
        let parsed: TenantId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}

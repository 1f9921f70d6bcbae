//! Payment service provider binding types.

use std::fmt::{self, Display};
use std::str::FromStr;

use validator::Validate;

/// Providers this platform can bind a merchant to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PspProvider {
    Stripe,
    Paypal,
}

impl Display for PspProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PspProvider::Stripe => write!(f, "stripe"),
            PspProvider::Paypal => write!(f, "paypal"),
        }
    }
}

impl FromStr for PspProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PspProvider::Stripe),
            "paypal" => Ok(PspProvider::Paypal),
            _ => Err(()),
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

    use super::PspProvider;

    impl NotNull for PspProvider {}
    impl SingleValue for PspProvider {}

    impl FromSqlRow<VarChar, Pg> for PspProvider {
        fn build_from_row<R: Row<Pg>>(row: &mut R) -> Result<Self, Box<Error + Send + Sync>> {
            match row.take() {
                Some(value) => {
                    let value = str::from_utf8(value).map_err(|_| "Unreadable value for PspProvider")?;
                    PspProvider::from_str(value)
                        .map_err(|_| format!("Unrecognized enum variant for PspProvider: {}", value).into())
                }
                None => Err("Unexpected null for non-null column `psp_provider`".into()),
            }
        }
    }

    impl Queryable<VarChar, Pg> for PspProvider {
        type Row = PspProvider;
        fn build(row: Self::Row) -> Self {
            row
        }
    }

    impl ToSql<VarChar, Pg> for PspProvider {
        fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> Result<IsNull, Box<Error + Send + Sync>> {
            out.write_all(self.to_string().as_bytes())?;
            Ok(IsNull::No)
        }
    }

    impl AsExpression<VarChar> for PspProvider {
        type Expression = Bound<VarChar, PspProvider>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }

    impl<'a> AsExpression<VarChar> for &'a PspProvider {
        type Expression = Bound<VarChar, &'a PspProvider>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }
}

/// Credential supplied by the merchant for verification. Never persisted,
/// never logged - the binding only records provider and verification time.
#[derive(Clone, Deserialize)]
pub struct PspCredential(String);

impl PspCredential {
    pub fn new(inner: String) -> Self {
        PspCredential(inner)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PspCredential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PspCredential(***)")
    }
}

/// Merchant request to link a payment provider
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ConnectPspPayload {
    pub provider: PspProvider,
    #[validate(length(min = "1"))]
    pub credential: String,
}

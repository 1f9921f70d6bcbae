//! Models for the append-only usage ledger and the read-only aggregate
//! views recomputed from it. Rows are never updated or deleted; the repo
//! only exposes inserts and aggregate selects.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::sql_types::{BigInt, Double, Timestamp, VarChar};

use models::TenantId;
use schema::usage_records;

/// Ledger tenant column value for calls rejected before authentication
pub const UNATTRIBUTED_TENANT: &str = "unknown";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UsageOutcome {
    Success,
    Error,
}

impl Display for UsageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            UsageOutcome::Success => write!(f, "success"),
            UsageOutcome::Error => write!(f, "error"),
        }
    }
}

impl FromStr for UsageOutcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(UsageOutcome::Success),
            "error" => Ok(UsageOutcome::Error),
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

    use super::UsageOutcome;

    impl NotNull for UsageOutcome {}
    impl SingleValue for UsageOutcome {}

    impl FromSqlRow<VarChar, Pg> for UsageOutcome {
        fn build_from_row<R: Row<Pg>>(row: &mut R) -> Result<Self, Box<Error + Send + Sync>> {
            match row.take() {
                Some(value) => {
                    let value = str::from_utf8(value).map_err(|_| "Unreadable value for UsageOutcome")?;
                    UsageOutcome::from_str(value)
                        .map_err(|_| format!("Unrecognized enum variant for UsageOutcome: {}", value).into())
                }
                None => Err("Unexpected null for non-null column `outcome`".into()),
            }
        }
    }

    impl Queryable<VarChar, Pg> for UsageOutcome {
        type Row = UsageOutcome;
        fn build(row: Self::Row) -> Self {
            row
        }
    }

    impl ToSql<VarChar, Pg> for UsageOutcome {
        fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> Result<IsNull, Box<Error + Send + Sync>> {
            out.write_all(self.to_string().as_bytes())?;
            Ok(IsNull::No)
        }
    }

    impl AsExpression<VarChar> for UsageOutcome {
        type Expression = Bound<VarChar, UsageOutcome>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }

    impl<'a> AsExpression<VarChar> for &'a UsageOutcome {
        type Expression = Bound<VarChar, &'a UsageOutcome>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }
}

#[derive(Serialize, Queryable, Clone, Debug)]
pub struct UsageRecord {
    pub id: i64,
    pub tenant_id: String,
    pub endpoint: String,
    pub outcome: UsageOutcome,
    pub error_kind: Option<String>,
    pub latency_ms: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "usage_records"]
pub struct NewUsageRecord {
    tenant_id: String,
    endpoint: String,
    outcome: UsageOutcome,
    error_kind: Option<String>,
    latency_ms: i32,
}

impl NewUsageRecord {
    pub fn success(tenant_id: &TenantId, endpoint: &str, latency_ms: i32) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            endpoint: endpoint.to_string(),
            outcome: UsageOutcome::Success,
            error_kind: None,
            latency_ms,
        }
    }

    /// Rejections are ledgered too; pre-authentication ones get the
    /// unattributed tenant marker
    pub fn error(tenant_id: Option<&TenantId>, endpoint: &str, error_kind: &str, latency_ms: i32) -> Self {
        Self {
            tenant_id: tenant_id.map(|id| id.to_string()).unwrap_or_else(|| UNATTRIBUTED_TENANT.to_string()),
            endpoint: endpoint.to_string(),
            outcome: UsageOutcome::Error,
            error_kind: Some(error_kind.to_string()),
            latency_ms,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn outcome(&self) -> UsageOutcome {
        self.outcome
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.error_kind.as_ref().map(|s| s.as_str())
    }

    pub fn latency_ms(&self) -> i32 {
        self.latency_ms
    }
}

impl Display for NewUsageRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "New Usage Record - tenant: {}; endpoint: {}; outcome: {}",
            self.tenant_id, self.endpoint, self.outcome
        )
    }
}

/// Per endpoint/outcome aggregate for a tenant
#[derive(Debug, QueryableByName, Serialize)]
pub struct UsageSummaryRow {
    #[sql_type = "VarChar"]
    pub endpoint: String,
    #[sql_type = "VarChar"]
    pub outcome: String,
    #[sql_type = "BigInt"]
    pub calls: i64,
    #[sql_type = "Double"]
    pub avg_latency_ms: f64,
}

/// Hourly call/error counts for a tenant
#[derive(Debug, QueryableByName, Serialize)]
pub struct UsageTimelineRow {
    #[sql_type = "Timestamp"]
    pub bucket: NaiveDateTime,
    #[sql_type = "BigInt"]
    pub calls: i64,
    #[sql_type = "BigInt"]
    pub errors: i64,
}

/// Merchant counts per onboarding stage
#[derive(Debug, QueryableByName, Serialize)]
pub struct FunnelRow {
    #[sql_type = "VarChar"]
    pub status: String,
    #[sql_type = "BigInt"]
    pub merchants: i64,
}

#[derive(Debug, Serialize)]
pub struct FunnelReport {
    pub stages: Vec<FunnelRow>,
}

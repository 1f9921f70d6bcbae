//! Models for merchant accounts passing the kyb onboarding workflow.
//!
//! A merchant moves `pending_documents -> pending_review -> pending_psp ->
//! active`, with `rejected` reachable from review and `deleted` a terminal
//! soft-delete from any state. Every transition is guarded by an expected
//! current status, enforced in the repo with a conditional update.

use std::fmt::{self, Display};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::sql_types::VarChar;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use models::{IssuedApiKey, MerchantDocument, PspProvider};
use schema::merchants;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
pub struct MerchantId(String);
derive_newtype_sql!(merchant_id, VarChar, MerchantId, MerchantId);

impl MerchantId {
    pub fn new() -> Self {
        MerchantId(format!("merch_{}", Uuid::new_v4().simple()))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl FromStr for MerchantId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("merch_") {
            Ok(MerchantId(s.to_string()))
        } else {
            Err(())
        }
    }
}

impl Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MerchantStatus {
    PendingDocuments,
    PendingReview,
    PendingPsp,
    Active,
    Rejected,
    Deleted,
}

impl MerchantStatus {
    /// States that still accept document uploads
    pub fn accepts_documents(&self) -> bool {
        match *self {
            MerchantStatus::PendingDocuments | MerchantStatus::PendingReview => true,
            _ => false,
        }
    }
}

impl Display for MerchantStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MerchantStatus::PendingDocuments => write!(f, "pending_documents"),
            MerchantStatus::PendingReview => write!(f, "pending_review"),
            MerchantStatus::PendingPsp => write!(f, "pending_psp"),
            MerchantStatus::Active => write!(f, "active"),
            MerchantStatus::Rejected => write!(f, "rejected"),
            MerchantStatus::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for MerchantStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_documents" => Ok(MerchantStatus::PendingDocuments),
            "pending_review" => Ok(MerchantStatus::PendingReview),
            "pending_psp" => Ok(MerchantStatus::PendingPsp),
            "active" => Ok(MerchantStatus::Active),
            "rejected" => Ok(MerchantStatus::Rejected),
            "deleted" => Ok(MerchantStatus::Deleted),
            _ => Err(()),
        }
    }
}

mod status_diesel_impl {
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

    use super::MerchantStatus;

    impl NotNull for MerchantStatus {}
    impl SingleValue for MerchantStatus {}

    impl FromSqlRow<VarChar, Pg> for MerchantStatus {
        fn build_from_row<R: Row<Pg>>(row: &mut R) -> Result<Self, Box<Error + Send + Sync>> {
            match row.take() {
                Some(value) => {
                    let value = str::from_utf8(value).map_err(|_| "Unreadable value for MerchantStatus")?;
                    MerchantStatus::from_str(value)
                        .map_err(|_| format!("Unrecognized enum variant for MerchantStatus: {}", value).into())
                }
                None => Err("Unexpected null for non-null column `status`".into()),
            }
        }
    }

    impl Queryable<VarChar, Pg> for MerchantStatus {
        type Row = MerchantStatus;
        fn build(row: Self::Row) -> Self {
            row
        }
    }

    impl ToSql<VarChar, Pg> for MerchantStatus {
        fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> Result<IsNull, Box<Error + Send + Sync>> {
            out.write_all(self.to_string().as_bytes())?;
            Ok(IsNull::No)
        }
    }

    impl AsExpression<VarChar> for MerchantStatus {
        type Expression = Bound<VarChar, MerchantStatus>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }

    impl<'a> AsExpression<VarChar> for &'a MerchantStatus {
        type Expression = Bound<VarChar, &'a MerchantStatus>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }
}

#[derive(Serialize, Queryable, Clone, Debug)]
pub struct Merchant {
    pub id: MerchantId,
    pub legal_name: String,
    pub contact_email: String,
    pub country: String,
    pub monthly_volume: BigDecimal,
    pub status: MerchantStatus,
    pub psp_provider: Option<PspProvider>,
    pub psp_validated: bool,
    pub psp_last_verified_at: Option<NaiveDateTime>,
    pub rejection_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "merchants"]
pub struct NewMerchant {
    id: MerchantId,
    legal_name: String,
    contact_email: String,
    country: String,
    monthly_volume: BigDecimal,
    status: MerchantStatus,
}

impl NewMerchant {
    pub fn new(payload: NewMerchantPayload) -> Self {
        let NewMerchantPayload {
            legal_name,
            contact_email,
            country,
            monthly_volume,
        } = payload;

        Self {
            id: MerchantId::new(),
            legal_name,
            contact_email,
            country,
            monthly_volume,
            status: MerchantStatus::PendingDocuments,
        }
    }

    pub fn id(&self) -> &MerchantId {
        &self.id
    }

    pub fn legal_name(&self) -> &str {
        &self.legal_name
    }

    pub fn contact_email(&self) -> &str {
        &self.contact_email
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn monthly_volume(&self) -> &BigDecimal {
        &self.monthly_volume
    }
}

impl Display for NewMerchant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "New Merchant - id: '{}'; legal name: '{}', country: {}",
            self.id, self.legal_name, self.country
        )
    }
}

/// Registration payload coming from the merchant portal
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewMerchantPayload {
    #[validate(length(min = "1"))]
    pub legal_name: String,
    #[validate(email)]
    pub contact_email: String,
    #[validate(custom = "validate_country")]
    pub country: String,
    pub monthly_volume: BigDecimal,
}

const COUNTRIES: &[&str] = &[
    "AT", "AU", "BE", "BG", "BR", "CA", "CH", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GB", "GR", "HK", "HR",
    "HU", "IE", "IN", "IT", "JP", "LT", "LU", "LV", "MT", "MX", "NL", "NO", "NZ", "PL", "PT", "RO", "SE", "SG", "SI",
    "SK", "US",
];

pub fn validate_country(country: &str) -> Result<(), ValidationError> {
    if COUNTRIES.contains(&country) {
        Ok(())
    } else {
        Err(ValidationError::new("country"))
    }
}

/// Merchant together with its uploaded kyb documents
#[derive(Clone, Debug, Serialize)]
pub struct MerchantWithDocuments {
    pub merchant: Merchant,
    pub documents: Vec<MerchantDocument>,
}

/// Result of a successful psp connection: the activated merchant and its
/// first api key, whose secret is shown exactly once
#[derive(Clone, Debug, Serialize)]
pub struct ActivatedMerchant {
    pub merchant: Merchant,
    pub api_key: IssuedApiKey,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Reviewer verdict coming from the employee portal
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub decision: ReviewDecision,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merchant_id_has_prefix() {
        let id = MerchantId::new();
        assert!(id.inner().starts_with("merch_"));
    }

    #[test]
    fn merchant_id_parses_only_prefixed_values() {
        assert!("merch_0123abcd".parse::<MerchantId>().is_ok());
        assert!("agent_0123abcd".parse::<MerchantId>().is_err());
        assert!("0123abcd".parse::<MerchantId>().is_err());
    }

    #[test]
    fn status_roundtrips_through_strings() {
        let statuses = [
            MerchantStatus::PendingDocuments,
            MerchantStatus::PendingReview,
            MerchantStatus::PendingPsp,
            MerchantStatus::Active,
            MerchantStatus::Rejected,
            MerchantStatus::Deleted,
        ];
        for status in &statuses {
            assert_eq!(status.to_string().parse::<MerchantStatus>(), Ok(*status));
        }
    }

    #[test]
    fn country_must_be_recognized() {
        assert!(validate_country("US").is_ok());
        assert!(validate_country("XX").is_err());
        assert!(validate_country("us").is_err());
    }
}

//! Models for kyb documents attached to a merchant during onboarding.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::NaiveDateTime;
use uuid::Uuid;
use validator::Validate;

use models::MerchantId;
use schema::merchant_documents;

/// Document kinds the platform knows about. The subset *required* for
/// activation is configuration (`onboarding.required_documents`).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash, IntoEnumIterator)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BusinessLicense,
    TaxId,
    ProofOfAddress,
}

impl Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DocumentType::BusinessLicense => write!(f, "business_license"),
            DocumentType::TaxId => write!(f, "tax_id"),
            DocumentType::ProofOfAddress => write!(f, "proof_of_address"),
        }
    }
}

impl FromStr for DocumentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business_license" => Ok(DocumentType::BusinessLicense),
            "tax_id" => Ok(DocumentType::TaxId),
            "proof_of_address" => Ok(DocumentType::ProofOfAddress),
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

    use super::DocumentType;

    impl NotNull for DocumentType {}
    impl SingleValue for DocumentType {}

    impl FromSqlRow<VarChar, Pg> for DocumentType {
        fn build_from_row<R: Row<Pg>>(row: &mut R) -> Result<Self, Box<Error + Send + Sync>> {
            match row.take() {
                Some(value) => {
                    let value = str::from_utf8(value).map_err(|_| "Unreadable value for DocumentType")?;
                    DocumentType::from_str(value)
                        .map_err(|_| format!("Unrecognized enum variant for DocumentType: {}", value).into())
                }
                None => Err("Unexpected null for non-null column `document_type`".into()),
            }
        }
    }

    impl Queryable<VarChar, Pg> for DocumentType {
        type Row = DocumentType;
        fn build(row: Self::Row) -> Self {
            row
        }
    }

    impl ToSql<VarChar, Pg> for DocumentType {
        fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> Result<IsNull, Box<Error + Send + Sync>> {
            out.write_all(self.to_string().as_bytes())?;
            Ok(IsNull::No)
        }
    }

    impl AsExpression<VarChar> for DocumentType {
        type Expression = Bound<VarChar, DocumentType>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }

    impl<'a> AsExpression<VarChar> for &'a DocumentType {
        type Expression = Bound<VarChar, &'a DocumentType>;
        fn as_expression(self) -> Self::Expression {
            Bound::new(self)
        }
    }
}

#[derive(Serialize, Queryable, Clone, Debug)]
pub struct MerchantDocument {
    pub id: Uuid,
    pub merchant_id: MerchantId,
    pub document_type: DocumentType,
    pub blob_ref: String,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "merchant_documents"]
pub struct NewMerchantDocument {
    id: Uuid,
    merchant_id: MerchantId,
    document_type: DocumentType,
    blob_ref: String,
}

impl NewMerchantDocument {
    pub fn new(merchant_id: MerchantId, document_type: DocumentType, blob_ref: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            merchant_id,
            document_type,
            blob_ref,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn merchant_id(&self) -> &MerchantId {
        &self.merchant_id
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn blob_ref(&self) -> &str {
        &self.blob_ref
    }
}

impl Display for NewMerchantDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "New Merchant Document - merchant id: '{}'; type: {}",
            self.merchant_id, self.document_type
        )
    }
}

/// Upload request from the merchant portal; the blob itself lives in
/// object storage, only the pointer travels here
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct UploadDocumentPayload {
    pub document_type: DocumentType,
    #[validate(length(min = "1"))]
    pub blob_ref: String,
}

use chrono::NaiveDateTime;

use models::{ApiKey, ApiKeyId, KeyPrefix};

/// Portal-safe view of a key row: the hash never leaves the service
#[derive(Clone, Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: ApiKeyId,
    pub key_prefix: KeyPrefix,
    pub created_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub last_used_at: Option<NaiveDateTime>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        ApiKeyResponse {
            id: key.id,
            key_prefix: key.key_prefix,
            created_at: key.created_at,
            revoked_at: key.revoked_at,
            last_used_at: key.last_used_at,
        }
    }
}

//! Models for api keys. The raw secret exists in memory only at issue
//! time and on authentication; storage holds a one-way hash plus a short
//! display prefix for the portals. `ApiKey` deliberately does not derive
//! `Serialize` - the wire shape lives in `controller::responses`.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::sql_types::VarChar;
use failure::Error as FailureError;
use hex;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use models::TenantId;
use schema::api_keys;

/// Tag every raw secret starts with; the part after it is hex entropy
const SECRET_TAG: &str = "sk";
/// 256 bits of entropy per key
const SECRET_BYTES: usize = 32;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
pub struct ApiKeyId(String);
derive_newtype_sql!(api_key_id, VarChar, ApiKeyId, ApiKeyId);

impl ApiKeyId {
    pub fn new() -> Self {
        ApiKeyId(format!("key_{}", Uuid::new_v4().simple()))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl FromStr for ApiKeyId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("key_") {
            Ok(ApiKeyId(s.to_string()))
        } else {
            Err(())
        }
    }
}

impl Display for ApiKeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sha-256 of the raw secret, hex encoded
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
pub struct KeyHash(String);
derive_newtype_sql!(key_hash, VarChar, KeyHash, KeyHash);

impl KeyHash {
    pub fn digest(raw: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.input(raw.as_bytes());
        KeyHash(hex::encode(hasher.result()))
    }

    /// Constant-time comparison so authentication does not leak how much
    /// of a presented key matched
    pub fn ct_matches(&self, other: &KeyHash) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

/// The short visible part of a key shown in the portals
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
pub struct KeyPrefix(String);
derive_newtype_sql!(key_prefix, VarChar, KeyPrefix, KeyPrefix);

impl KeyPrefix {
    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A freshly generated secret. Debug never prints the value.
#[derive(Clone)]
pub struct RawApiKey(String);

impl RawApiKey {
    pub fn generate() -> Result<Self, FailureError> {
        let mut rng = OsRng::new().map_err(|e| FailureError::from(e).context("Could not access the os entropy source"))?;
        let mut bytes = [0u8; SECRET_BYTES];
        rng.fill_bytes(&mut bytes);
        Ok(RawApiKey(format!("{}_{}", SECRET_TAG, hex::encode(&bytes[..]))))
    }

    /// Display prefix of an arbitrary presented key, or None when the
    /// value does not even have the right shape
    pub fn display_prefix(raw: &str, visible_len: usize) -> Option<KeyPrefix> {
        let tagged = format!("{}_", SECRET_TAG);
        if !raw.starts_with(&tagged) {
            return None;
        }
        let entropy = &raw[tagged.len()..];
        if entropy.len() < visible_len || !entropy.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(KeyPrefix(format!("{}_{}", SECRET_TAG, &entropy[..visible_len])))
    }

    pub fn hash(&self) -> KeyHash {
        KeyHash::digest(&self.0)
    }

    pub fn prefix(&self, visible_len: usize) -> KeyPrefix {
        Self::display_prefix(&self.0, visible_len).expect("Generated keys always carry the tag and hex entropy")
    }

    /// Hands out the secret; call sites are the single-use responses
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawApiKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("RawApiKey(***)")
    }
}

/// Wire shape of a freshly issued key - the only place the raw secret
/// ever appears, returned to the caller exactly once
#[derive(Clone, Debug, Serialize)]
pub struct IssuedApiKey {
    pub id: ApiKeyId,
    pub key_prefix: KeyPrefix,
    pub secret: String,
}

impl IssuedApiKey {
    pub fn new(key: ApiKey, raw: RawApiKey) -> Self {
        IssuedApiKey {
            id: key.id,
            key_prefix: key.key_prefix,
            secret: raw.expose().to_string(),
        }
    }
}

#[derive(Queryable, Clone, Debug)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub tenant_id: TenantId,
    pub key_hash: KeyHash,
    pub key_prefix: KeyPrefix,
    pub created_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub last_used_at: Option<NaiveDateTime>,
}

impl ApiKey {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "api_keys"]
pub struct NewApiKey {
    id: ApiKeyId,
    tenant_id: TenantId,
    key_hash: KeyHash,
    key_prefix: KeyPrefix,
}

impl NewApiKey {
    /// Generates a key for the tenant, returning the row to persist and
    /// the raw secret to hand to the caller exactly once
    pub fn generate(tenant_id: TenantId, visible_len: usize) -> Result<(NewApiKey, RawApiKey), FailureError> {
        let raw = RawApiKey::generate()?;
        let new_key = NewApiKey {
            id: ApiKeyId::new(),
            tenant_id,
            key_hash: raw.hash(),
            key_prefix: raw.prefix(visible_len),
        };
        Ok((new_key, raw))
    }

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn key_hash(&self) -> &KeyHash {
        &self.key_hash
    }

    pub fn key_prefix(&self) -> &KeyPrefix {
        &self.key_prefix
    }
}

impl Display for NewApiKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "New Api Key - id: '{}'; tenant: {}; prefix: {}", self.id, self.tenant_id, self.key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::MerchantId;

    #[test]
    fn generated_keys_have_tag_and_entropy() {
        let raw = RawApiKey::generate().unwrap();
        assert!(raw.expose().starts_with("sk_"));
        // tag + separator + 32 bytes hex encoded
        assert_eq!(raw.expose().len(), 3 + 64);
    }

    #[test]
    fn display_prefix_extracts_visible_part() {
        let prefix = RawApiKey::display_prefix("sk_0123456789abcdef0123", 8).unwrap();
        assert_eq!(prefix.inner(), "sk_01234567");
    }

    #[test]
    fn display_prefix_rejects_malformed_keys() {
        assert!(RawApiKey::display_prefix("pk_0123456789abcdef", 8).is_none());
        assert!(RawApiKey::display_prefix("sk_short", 8).is_none());
        assert!(RawApiKey::display_prefix("sk_zzzzzzzzzzzzzzzz", 8).is_none());
    }

    #[test]
    fn hash_is_deterministic_and_comparison_constant_time() {
        let raw = RawApiKey::generate().unwrap();
        let first = raw.hash();
        let second = KeyHash::digest(raw.expose());
        assert!(first.ct_matches(&second));

        let other = RawApiKey::generate().unwrap();
        assert!(!first.ct_matches(&other.hash()));
    }

    #[test]
    fn generate_binds_key_to_tenant() {
        let tenant = TenantId::Merchant(MerchantId::new());
        let (new_key, raw) = NewApiKey::generate(tenant, 8).unwrap();
        assert!(new_key.id().inner().starts_with("key_"));
        assert_eq!(new_key.key_prefix().inner(), raw.prefix(8).inner());
    }
}

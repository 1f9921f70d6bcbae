//! Models for managing employee roles. UserRole connects portal users
//! and roles, i.e. this table is for user has-many roles relationship.

use diesel::sql_types::{Integer, Uuid as SqlUuid};
use serde_json;
use uuid::Uuid;

use models::Role;
use schema::user_roles;

#[derive(Clone, Copy, Debug, Display, FromStr, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "SqlUuid"]
pub struct RoleId(pub Uuid);
derive_newtype_sql!(role_id, SqlUuid, RoleId, RoleId);

impl RoleId {
    pub fn new() -> Self {
        RoleId(Uuid::new_v4())
    }
}

#[derive(Clone, Copy, Debug, Display, FromStr, PartialEq, Eq, Hash, Serialize, Deserialize, FromSqlRow, AsExpression)]
#[sql_type = "Integer"]
pub struct UserId(pub i32);
derive_newtype_sql!(user_id, Integer, UserId, UserId);

#[derive(Serialize, Queryable, Insertable, Debug, Clone)]
#[table_name = "user_roles"]
pub struct UserRole {
    pub id: RoleId,
    pub user_id: UserId,
    pub name: Role,
    pub data: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Insertable)]
#[table_name = "user_roles"]
pub struct NewUserRole {
    pub id: RoleId,
    pub user_id: UserId,
    pub name: Role,
    pub data: Option<serde_json::Value>,
}

//! Models for autonomous agent accounts. Agents are provisioned lazily:
//! the first verified sign-in creates the row through an idempotent
//! `get_or_create`, keyed on the subject of the external identity
//! assertion.

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::sql_types::VarChar;
use uuid::Uuid;
use validator::Validate;

use models::IssuedApiKey;
use schema::agents;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash, FromSqlRow, AsExpression)]
#[sql_type = "VarChar"]
pub struct AgentId(String);
derive_newtype_sql!(agent_id, VarChar, AgentId, AgentId);

impl AgentId {
    pub fn new() -> Self {
        AgentId(format!("agent_{}", Uuid::new_v4().simple()))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl FromStr for AgentId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("agent_") {
            Ok(AgentId(s.to_string()))
        } else {
            Err(())
        }
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Queryable, Clone, Debug)]
pub struct Agent {
    pub id: AgentId,
    pub external_subject: String,
    pub display_name: String,
    pub contact_email: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "agents"]
pub struct NewAgent {
    id: AgentId,
    external_subject: String,
    display_name: String,
    contact_email: String,
    is_active: bool,
}

impl NewAgent {
    pub fn new(external_subject: String, display_name: String, contact_email: String) -> Self {
        Self {
            id: AgentId::new(),
            external_subject,
            display_name,
            contact_email,
            is_active: true,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn external_subject(&self) -> &str {
        &self.external_subject
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn contact_email(&self) -> &str {
        &self.contact_email
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Display for NewAgent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "New Agent - id: '{}'; external subject: '{}'",
            self.id, self.external_subject
        )
    }
}

/// Result of a verified sign-in. The api key is present only when the
/// agent had no live key, i.e. on first provisioning.
#[derive(Clone, Debug, Serialize)]
pub struct AgentSession {
    pub agent: Agent,
    pub api_key: Option<IssuedApiKey>,
}

/// Sign-in request carrying the external identity assertion (a signed
/// jwt issued by the agent platform's identity provider)
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct AgentSignInPayload {
    #[validate(length(min = "1"))]
    pub assertion: String,
}

/// Claims this service expects inside the identity assertion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentIdentityClaims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub exp: u64,
}

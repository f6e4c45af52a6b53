//! Instance domain model

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Sentinel meaning "no domain restriction"
pub const WILDCARD_DOMAIN: &str = "*";

/// Who may respond to an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    OpenToAll,
    OpenWithinOrganization,
    OpenToSpecificUsers,
}

impl AuthType {
    fn as_str(&self) -> &'static str {
        match self {
            AuthType::OpenToAll => "open_to_all",
            AuthType::OpenWithinOrganization => "open_within_organization",
            AuthType::OpenToSpecificUsers => "open_to_specific_users",
        }
    }
}

impl std::str::FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open_to_all" => Ok(AuthType::OpenToAll),
            "open_within_organization" => Ok(AuthType::OpenWithinOrganization),
            "open_to_specific_users" => Ok(AuthType::OpenToSpecificUsers),
            _ => Err(format!("Unknown auth type: {}", s)),
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::MySql> for AuthType {
    fn decode(
        value: sqlx::mysql::MySqlValueRef<'r>,
    ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<'r, sqlx::MySql>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl sqlx::Type<sqlx::MySql> for AuthType {
    fn type_info() -> sqlx::mysql::MySqlTypeInfo {
        <String as sqlx::Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::MySql> for AuthType {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<u8>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::MySql>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Whether an instance currently accepts responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Closed,
    #[default]
    Open,
}

impl InstanceStatus {
    fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Closed => "closed",
            InstanceStatus::Open => "open",
        }
    }
}

impl std::str::FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "closed" => Ok(InstanceStatus::Closed),
            "open" => Ok(InstanceStatus::Open),
            _ => Err(format!("Unknown instance status: {}", s)),
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::MySql> for InstanceStatus {
    fn decode(
        value: sqlx::mysql::MySqlValueRef<'r>,
    ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<'r, sqlx::MySql>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl sqlx::Type<sqlx::MySql> for InstanceStatus {
    fn type_info() -> sqlx::mysql::MySqlTypeInfo {
        <String as sqlx::Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::MySql> for InstanceStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<u8>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::MySql>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Instance entity: one configured survey/access-control context
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Instance {
    pub id: StringUuid,
    /// Opaque public identifier, 16 hex chars, immutable after creation
    pub hash: String,
    pub owner_id: StringUuid,
    pub name: String,
    pub description: String,
    pub auth_type: AuthType,
    pub status: InstanceStatus,
    #[sqlx(json)]
    pub allowed_domains: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Instance {
    /// True when the allow-list is exactly the wildcard sentinel
    pub fn allows_any_domain(&self) -> bool {
        self.allowed_domains.len() == 1 && self.allowed_domains[0] == WILDCARD_DOMAIN
    }
}

impl Default for Instance {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            hash: String::new(),
            owner_id: StringUuid::new_v4(),
            name: String::new(),
            description: String::new(),
            auth_type: AuthType::default(),
            status: InstanceStatus::default(),
            allowed_domains: vec![WILDCARD_DOMAIN.to_string()],
            created_at: now,
            last_modified: now,
        }
    }
}

/// Input for creating a new instance
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInstanceInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub status: InstanceStatus,
    pub allowed_domains: Option<Vec<String>>,
}

/// Input for updating an instance
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateInstanceInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub auth_type: Option<AuthType>,
    pub status: Option<InstanceStatus>,
    pub allowed_domains: Option<Vec<String>>,
}

/// Fully resolved row for insertion (hash and domain defaults applied)
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub hash: String,
    pub owner_id: StringUuid,
    pub name: String,
    pub description: String,
    pub auth_type: AuthType,
    pub status: InstanceStatus,
    pub allowed_domains: Vec<String>,
}

/// The only field subset exposed without authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatusView {
    pub hash: String,
    pub auth_type: AuthType,
    pub status: InstanceStatus,
}

impl From<&Instance> for InstanceStatusView {
    fn from(instance: &Instance) -> Self {
        Self {
            hash: instance.hash.clone(),
            auth_type: instance.auth_type,
            status: instance.status,
        }
    }
}

//! Respondent domain model

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// How a respondent record came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RespondentOrigin {
    OauthVerified,
    #[default]
    ListImported,
}

impl RespondentOrigin {
    fn as_str(&self) -> &'static str {
        match self {
            RespondentOrigin::OauthVerified => "oauth_verified",
            RespondentOrigin::ListImported => "list_imported",
        }
    }
}

impl std::str::FromStr for RespondentOrigin {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oauth_verified" => Ok(RespondentOrigin::OauthVerified),
            "list_imported" => Ok(RespondentOrigin::ListImported),
            _ => Err(format!("Unknown respondent origin: {}", s)),
        }
    }
}

impl std::fmt::Display for RespondentOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::MySql> for RespondentOrigin {
    fn decode(
        value: sqlx::mysql::MySqlValueRef<'r>,
    ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<'r, sqlx::MySql>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl sqlx::Type<sqlx::MySql> for RespondentOrigin {
    fn type_info() -> sqlx::mysql::MySqlTypeInfo {
        <String as sqlx::Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::MySql> for RespondentOrigin {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<u8>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::MySql>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Respondent entity: one person's access to one instance
///
/// For OAuth-origin respondents the username is the verified email; for
/// list-origin respondents it is the imported identifier. The pair
/// (instance_id, username) is unique across both origins.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Respondent {
    pub id: StringUuid,
    pub instance_id: StringUuid,
    pub origin: RespondentOrigin,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
}

impl Default for Respondent {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            instance_id: StringUuid::new_v4(),
            origin: RespondentOrigin::default(),
            first_name: String::new(),
            last_name: String::new(),
            username: String::new(),
            password_hash: String::new(),
            has_voted: false,
            created_at: Utc::now(),
        }
    }
}

/// Respondent fields as supplied by a caller (plain password)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRespondent {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Fully resolved row for insertion (password already hashed)
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRespondentInput {
    pub instance_id: StringUuid,
    pub origin: RespondentOrigin,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password_hash: String,
}

/// Input for updating a respondent
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRespondentInput {
    #[validate(length(max = 30))]
    pub first_name: Option<String>,
    #[validate(length(max = 30))]
    pub last_name: Option<String>,
    pub has_voted: Option<bool>,
}

/// Identity returned by the external provider after a completed exchange
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Owner account, at the boundary of the owner-authentication subsystem.
/// Only lookup and deletion by email are in scope here (admission cleanup).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OwnerAccount {
    pub id: StringUuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

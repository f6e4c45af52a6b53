//! Respondent API handlers
//!
//! Owner-facing listing, export, bulk import and per-respondent CRUD.
//! All routes resolve the instance through the owner-scoped lookup, so a
//! foreign instance reads as 404.

use crate::api::SuccessResponse;
use crate::domain::{Respondent, RespondentOrigin, UpdateRespondentInput};
use crate::error::{AppError, Result};
use crate::import::{parse_dataset, ColumnMapping, ImportFormat};
use crate::middleware::OwnerIdentity;
use crate::server::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Short origin names used in query strings
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginFilter {
    #[default]
    List,
    Oauth,
}

impl From<OriginFilter> for RespondentOrigin {
    fn from(filter: OriginFilter) -> Self {
        match filter {
            OriginFilter::List => RespondentOrigin::ListImported,
            OriginFilter::Oauth => RespondentOrigin::OauthVerified,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OriginQuery {
    #[serde(default)]
    pub origin: OriginFilter,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub origin: OriginFilter,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub format: Option<String>,
}

/// Row shape for exports; credentials never leave the store
#[derive(Debug, Serialize)]
struct RespondentExport {
    first_name: String,
    last_name: String,
    username: String,
    has_voted: bool,
    created_at: DateTime<Utc>,
}

impl From<&Respondent> for RespondentExport {
    fn from(r: &Respondent) -> Self {
        Self {
            first_name: r.first_name.clone(),
            last_name: r.last_name.clone(),
            username: r.username.clone(),
            has_voted: r.has_voted,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub created: u64,
}

/// List respondents of an instance, filtered by origin
pub async fn list(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path(hash): Path<String>,
    Query(query): Query<OriginQuery>,
) -> Result<impl IntoResponse> {
    let instance = state
        .instance_service
        .resolve_for_owner(&hash, owner.user_id)
        .await?;
    let respondents = state
        .respondent_service
        .list_by_origin(instance.id, query.origin.into())
        .await?;
    Ok(Json(SuccessResponse::new(respondents)))
}

/// Download respondents as a CSV or JSON attachment
pub async fn download(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path(hash): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse> {
    let format: ImportFormat = query
        .format
        .as_deref()
        .ok_or_else(|| AppError::Validation("Format is required for download".to_string()))?
        .parse()
        .map_err(|_| AppError::Validation("Invalid format for download".to_string()))?;

    let instance = state
        .instance_service
        .resolve_for_owner(&hash, owner.user_id)
        .await?;
    let respondents = state
        .respondent_service
        .list_by_origin(instance.id, query.origin.into())
        .await?;
    let exports: Vec<RespondentExport> = respondents.iter().map(RespondentExport::from).collect();

    let (content_type, file_name, body) = match format {
        ImportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for export in &exports {
                writer
                    .serialize(export)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("CSV write error: {}", e)))?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| AppError::Internal(anyhow::anyhow!("CSV write error: {}", e)))?;
            ("text/csv", "users.csv", bytes)
        }
        ImportFormat::Json => {
            let bytes = serde_json::to_vec(&exports).map_err(|e| AppError::Internal(e.into()))?;
            ("application/json", "users.json", bytes)
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    ))
}

/// Bulk import respondents from an uploaded CSV or JSON file.
///
/// Multipart parts: `file` (the dataset) plus text parts naming the
/// columns that hold `username`, `password` and optionally `first_name`
/// and `last_name`. All-or-nothing: any bad row aborts the whole batch.
pub async fn import(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path(hash): Path<String>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let format: ImportFormat = query
        .format
        .as_deref()
        .unwrap_or("csv")
        .parse()
        .map_err(|_| AppError::Validation("Invalid import format".to_string()))?;

    let instance = state
        .instance_service
        .resolve_for_owner(&hash, owner.user_id)
        .await?;

    let mut file: Option<Vec<u8>> = None;
    let mut first_name = None;
    let mut last_name = None;
    let mut username = None;
    let mut password = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable file upload: {}", e)))?;
                file = Some(bytes.to_vec());
            }
            "first_name" | "last_name" | "username" | "password" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid mapping field: {}", e)))?;
                let value = (!value.is_empty()).then_some(value);
                match name.as_str() {
                    "first_name" => first_name = value,
                    "last_name" => last_name = value,
                    "username" => username = value,
                    _ => password = value,
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("File is required".to_string()))?;
    let (username, password) = match (username, password) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            return Err(AppError::Validation(
                "Username and password mapping fields are required".to_string(),
            ));
        }
    };

    let mapping = ColumnMapping {
        first_name,
        last_name,
        username,
        password,
    };
    let dataset = parse_dataset(&file, format)?;

    let created = state
        .respondent_service
        .import(&instance, &mapping, &dataset)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(ImportSummary { created })),
    ))
}

/// Get a single respondent by username
pub async fn get(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path((hash, username)): Path<(String, String)>,
    Query(query): Query<OriginQuery>,
) -> Result<impl IntoResponse> {
    let instance = state
        .instance_service
        .resolve_for_owner(&hash, owner.user_id)
        .await?;
    let respondent = state
        .respondent_service
        .get_by_username(instance.id, &username, Some(query.origin.into()))
        .await?;
    Ok(Json(SuccessResponse::new(respondent)))
}

/// Update a respondent's profile fields
pub async fn update(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path((hash, username)): Path<(String, String)>,
    Json(input): Json<UpdateRespondentInput>,
) -> Result<impl IntoResponse> {
    let instance = state
        .instance_service
        .resolve_for_owner(&hash, owner.user_id)
        .await?;
    let respondent = state
        .respondent_service
        .update(instance.id, &username, input)
        .await?;
    Ok(Json(SuccessResponse::new(respondent)))
}

/// Delete a respondent
pub async fn delete(
    State(state): State<AppState>,
    owner: OwnerIdentity,
    Path((hash, username)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let instance = state
        .instance_service
        .resolve_for_owner(&hash, owner.user_id)
        .await?;
    state
        .respondent_service
        .delete(instance.id, &username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Respondent authentication handlers: password login and the OAuth
//! initiate/callback pair. None of these require owner authentication.

use crate::api::SuccessResponse;
use crate::error::{AppError, Result};
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token response for password login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access: String,
}

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizationUrlResponse {
    pub authorization_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Password login for list-origin respondents; mints an instance-scoped
/// access token. Unknown username and wrong password are indistinguishable.
pub async fn login(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;

    let instance = state.instance_service.resolve(&hash).await?;
    let token = state
        .credential_service
        .authenticate_password(&instance, &input.username, &input.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse { access: token }),
    ))
}

/// Begin an OAuth handshake; the caller performs the redirect to the
/// returned authorization URL.
pub async fn oauth_start(
    State(state): State<AppState>,
    Path((hash, provider)): Path<(String, String)>,
    Query(query): Query<StartQuery>,
) -> Result<impl IntoResponse> {
    let redirect_uri = query
        .redirect_uri
        .ok_or_else(|| AppError::BadRequest("redirect_uri is required".to_string()))?;

    let authorization_url = state
        .oauth_service
        .start(&hash, &provider, &redirect_uri)
        .await?;

    Ok(Json(SuccessResponse::new(AuthorizationUrlResponse {
        authorization_url,
    })))
}

/// Complete an OAuth handshake. The respondent lands here from the
/// provider; both success and domain rejection answer with a redirect,
/// never a JSON error.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    if provider != crate::oauth::GOOGLE_PROVIDER {
        return Err(AppError::BadRequest(format!(
            "Unknown identity provider '{}'",
            provider
        )));
    }

    let (code, oauth_state) = match (query.code, query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => {
            return Err(AppError::BadRequest(
                "Missing code or state in the request".to_string(),
            ));
        }
    };

    let outcome = state.oauth_service.callback(&code, &oauth_state).await?;
    Ok(Redirect::to(outcome.redirect_url()).into_response())
}

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::core::{app_error::AppError, app_state::AppState};

/// Identity resolved by the auth service for a bearer token.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub customer_id: i32,
    pub role: String,
}

#[derive(Deserialize)]
struct AuthMeRes {
    data: Option<AuthSession>,
}

fn auth_service_url() -> String {
    std::env::var("AUTH_SERVICE_URL").unwrap_or("http://localhost:3000/auth-service".to_string())
}

// Copies the token out so no request borrow is held across the await below.
fn bearer_token(request: &Request) -> Result<String, AppError> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}

async fn resolve_session(client: &reqwest::Client, token: &str) -> Result<AuthSession, AppError> {
    let res = client
        .get(format!("{}/auth/me", auth_service_url()))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("AuthService".into()))?;

    if !res.status().is_success() {
        return Err(AppError::Unauthorized);
    }

    let body: AuthMeRes = res.json().await.map_err(|_| AppError::Unauthorized)?;
    body.data.ok_or(AppError::Unauthorized)
}

/// Require a valid customer bearer token; injects the customer id as an
/// `Extension<i32>` for downstream handlers.
pub async fn customers_authorization(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;
    let session = resolve_session(&state.http_client, &token).await?;
    request.extensions_mut().insert(session.customer_id);
    Ok(next.run(request).await)
}

/// Same as [`customers_authorization`] but additionally requires the `admin`
/// role.
pub async fn admins_authorization(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;
    let session = resolve_session(&state.http_client, &token).await?;
    if session.role != "admin" {
        return Err(AppError::ForbiddenResource(
            "Admin role is required".into(),
        ));
    }
    request.extensions_mut().insert(session.customer_id);
    Ok(next.run(request).await)
}

use super::{check_status, ApiConfig, ApiError};
use crate::session::models::UserProfile;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

pub async fn login(config: &ApiConfig, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
    post_credentials(config, "login", &LoginRequest { email, password }).await
}

pub async fn register(
    config: &ApiConfig,
    email: &str,
    password: &str,
    full_name: &str,
) -> Result<AuthResponse, ApiError> {
    let body = RegisterRequest {
        email,
        password,
        full_name,
    };
    post_credentials(config, "register", &body).await
}

async fn post_credentials<B: Serialize>(
    config: &ApiConfig,
    endpoint: &str,
    body: &B,
) -> Result<AuthResponse, ApiError> {
    let url = config.url(&format!("/api/auth/{}", endpoint));
    debug!(%url, "sending credentials");

    let resp = config
        .client()?
        .post(url)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;
    let resp = check_status(resp).await?;

    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
}

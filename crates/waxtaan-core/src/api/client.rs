use futures::future::join_all;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::warn;

use super::error::ApiError;
use super::wire::{parse_list, LoginResponse, WireGroup, WireMessage};
use crate::constants::endpoints;
use crate::models::{Attachment, Group, Identity, OutgoingMessage, ProfileUpdate, RawMessage, User};

/// HTTP client for the messaging backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        // Url::join drops the last path segment unless it ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base =
            Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base,
            client: reqwest::Client::new(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // ===== Users =====

    /// Exchange credentials for a bearer token
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url(&[endpoints::LOGIN])?)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let login: LoginResponse = decode(check(response).await?).await?;
        Ok(login.token)
    }

    /// Create an account. Returns a token when the server hands one back.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        avatar: Option<Attachment>,
    ) -> Result<Option<String>, ApiError> {
        let mut form = Form::new()
            .text("username", username.to_string())
            .text("password", password.to_string());
        if let Some(avatar) = avatar {
            form = form.part("avatar", file_part(avatar));
        }
        let response = self
            .client
            .post(self.url(&[endpoints::REGISTER])?)
            .multipart(form)
            .send()
            .await?;
        let body = check(response).await?.text().await?;
        let token = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("token").and_then(|t| t.as_str()).map(str::to_string));
        Ok(token)
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        let request = self.client.get(self.url(&[endpoints::ME])?);
        decode(self.send(request).await?).await
    }

    pub async fn get_user(&self, id: &Identity) -> Result<User, ApiError> {
        let request = self.client.get(self.url(&[endpoints::USERS, id.as_str()])?);
        decode(self.send(request).await?).await
    }

    /// Look up several users concurrently; results keep the order of `ids`
    pub async fn get_users(&self, ids: &[Identity]) -> Vec<Result<User, ApiError>> {
        join_all(ids.iter().map(|id| self.get_user(id))).await
    }

    /// The caller's contacts. Lookups that fail are skipped.
    pub async fn contacts(&self, me: &User) -> Vec<User> {
        // Some accounts have ids stored with their JSON quotes
        let ids: Vec<Identity> = me
            .contacts
            .iter()
            .map(|id| Identity::from(id.as_str().trim().trim_matches('"').trim()))
            .filter(|id| !id.as_str().is_empty())
            .collect();
        self.get_users(&ids)
            .await
            .into_iter()
            .zip(&ids)
            .filter_map(|(result, id)| match result {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("skipping contact {}: {}", id, e);
                    None
                }
            })
            .collect()
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<User, ApiError> {
        let request = self
            .client
            .get(self.url(&[endpoints::USER_BY_USERNAME, username])?);
        decode(self.send(request).await?).await
    }

    pub async fn add_contact(&self, my_id: &Identity, contact_id: &Identity) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url(&[endpoints::USERS, my_id.as_str(), "contacts"])?)
            .json(contact_id);
        self.send(request).await?;
        Ok(())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let mut form = Form::new()
            .text("name", update.name.clone())
            .text("status", update.status.clone());
        if let Some(password) = update.password.as_ref().filter(|p| !p.is_empty()) {
            form = form.text("password", password.clone());
        }
        if let Some(avatar) = &update.avatar {
            form = form.part("avatar", file_part(avatar.clone()));
        }
        let request = self.client.put(self.url(&[endpoints::ME])?).multipart(form);
        decode(self.send(request).await?).await
    }

    // ===== Messages =====

    /// Every message visible to the current user. Records that fail to
    /// parse are logged and skipped.
    pub async fn messages(&self) -> Result<Vec<RawMessage>, ApiError> {
        let request = self.client.get(self.url(&[endpoints::MESSAGES])?);
        let values: Vec<serde_json::Value> = decode(self.send(request).await?).await?;
        Ok(parse_list::<WireMessage, RawMessage>(values, "message"))
    }

    pub async fn send_message(
        &self,
        message: &OutgoingMessage,
        file: Option<Attachment>,
    ) -> Result<(), ApiError> {
        let payload =
            serde_json::to_string(message).map_err(|e| ApiError::Decode(e.to_string()))?;
        let mut form = Form::new().part("message", Part::text(payload).mime_str("application/json")?);
        if let Some(file) = file {
            form = form.part("file", file_part(file));
        }
        let request = self
            .client
            .post(self.url(&[endpoints::MESSAGES])?)
            .multipart(form);
        self.send(request).await?;
        Ok(())
    }

    // ===== Groups =====

    pub async fn groups(&self) -> Result<Vec<Group>, ApiError> {
        let request = self.client.get(self.url(&[endpoints::GROUPS])?);
        let values: Vec<serde_json::Value> = decode(self.send(request).await?).await?;
        Ok(parse_list::<WireGroup, Group>(values, "group"))
    }

    pub async fn get_group(&self, id: &Identity) -> Result<Group, ApiError> {
        let request = self.client.get(self.url(&[endpoints::GROUPS, id.as_str()])?);
        let group: WireGroup = decode(self.send(request).await?).await?;
        Ok(group.into())
    }

    pub async fn create_group(&self, name: &str, members: &[Identity]) -> Result<Group, ApiError> {
        let request = self
            .client
            .post(self.url(&[endpoints::GROUPS])?)
            .json(&json!({ "name": name, "members": members }));
        let group: WireGroup = decode(self.send(request).await?).await?;
        Ok(group.into())
    }

    // ===== Plumbing =====

    /// Build `<base>/<segments...>`. The first segment is an endpoint path
    /// (may contain '/'); the rest are percent-encoded as single segments.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let (endpoint, rest) = segments
            .split_first()
            .ok_or_else(|| ApiError::InvalidUrl("empty path".to_string()))?;
        let mut url = self
            .base
            .join(endpoint)
            .map_err(|e| ApiError::InvalidUrl(format!("{endpoint}: {e}")))?;
        if !rest.is_empty() {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(rest);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthorized)?;
        let response = request.bearer_auth(token).send().await?;
        check(response).await
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

fn file_part(attachment: Attachment) -> Part {
    Part::bytes(attachment.bytes).file_name(attachment.file_name)
}

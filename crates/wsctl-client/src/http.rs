//! HTTP implementation of the platform contracts.

use crate::api::{RepositoryProbe, SessionApi};
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use wsctl_api::{ErrorEnvelope, SessionCreateRequest, SessionList, SessionPatch};
use wsctl_core::{Session, SessionName, WorkingTreeStatus};

/// Connection settings for the platform API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the platform (e.g., "https://compute.example.org")
    pub base_url: String,

    /// Bearer token; anonymous access is allowed on some deployments
    pub token: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// reqwest-backed [`SessionApi`] and [`RepositoryProbe`].
pub struct HttpSessionApi {
    client: Client,
    config: ApiConfig,
}

impl HttpSessionApi {
    /// Creates a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the underlying client cannot
    /// be constructed (bad TLS backend, invalid settings).
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status,
            message: ErrorEnvelope::message_from_body(&body),
        })
    }

    async fn decode_session(response: Response) -> Result<Session, ApiError> {
        response
            .json::<Session>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn list_sessions(&self) -> Result<HashMap<String, Session>, ApiError> {
        let request = self.authorize(self.client.get(self.url("sessions")));
        let response = self.send(request).await?;
        let list: SessionList = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(list.sessions)
    }

    async fn get_session(&self, name: &SessionName) -> Result<Option<Session>, ApiError> {
        let request = self.authorize(self.client.get(self.url(&format!("sessions/{name}"))));
        match self.send(request).await {
            Ok(response) => Ok(Some(Self::decode_session(response).await?)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_session(&self, body: &SessionCreateRequest) -> Result<Session, ApiError> {
        let request = self.authorize(self.client.post(self.url("sessions")).json(body));
        let response = self.send(request).await?;
        Self::decode_session(response).await
    }

    async fn patch_session(
        &self,
        name: &SessionName,
        patch: &SessionPatch,
    ) -> Result<Session, ApiError> {
        debug!(session = %name, ?patch, "Patching session");
        let request = self.authorize(
            self.client
                .patch(self.url(&format!("sessions/{name}")))
                .json(patch),
        );
        let response = self.send(request).await?;
        Self::decode_session(response).await
    }

    async fn delete_session(&self, name: &SessionName) -> Result<(), ApiError> {
        let request = self.authorize(self.client.delete(self.url(&format!("sessions/{name}"))));
        self.send(request).await?;
        Ok(())
    }

    async fn session_logs(
        &self,
        name: &SessionName,
        max_lines: Option<u32>,
    ) -> Result<String, ApiError> {
        let mut request = self
            .client
            .get(self.url(&format!("sessions/{name}/logs")));
        if let Some(lines) = max_lines {
            request = request.query(&[("max_lines", lines)]);
        }
        let response = self.send(self.authorize(request)).await?;
        response
            .text()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RepositoryProbe for HttpSessionApi {
    async fn working_tree(&self, name: &SessionName) -> Result<WorkingTreeStatus, ApiError> {
        let request = self.authorize(
            self.client
                .get(self.url(&format!("sessions/{name}/working_tree"))),
        );
        let response = self.send(request).await?;
        response
            .json::<WorkingTreeStatus>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

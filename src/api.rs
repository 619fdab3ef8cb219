//! Typed client for the tracker's REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{
    AuthResponse, Credentials, NewProblem, NewTopic, Problem, ProgressSummary, RegisterResponse,
    Registration, Topic, User,
};
use crate::session::SessionContext;

/// Everything the client needs from the backend. Reads are idempotent;
/// `toggle_problem` is the only write on the hot path.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn register(&self, registration: &Registration) -> Result<User, ApiError>;
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;
    async fn profile(&self) -> Result<User, ApiError>;

    async fn list_topics(&self) -> Result<Vec<Topic>, ApiError>;
    async fn get_topic(&self, topic_id: &str) -> Result<Topic, ApiError>;
    async fn create_topic(&self, topic: &NewTopic) -> Result<Topic, ApiError>;

    async fn list_problems(&self) -> Result<Vec<Problem>, ApiError>;
    async fn problems_for_topic(&self, topic_id: &str) -> Result<Vec<Problem>, ApiError>;
    async fn create_problem(&self, problem: &NewProblem) -> Result<Problem, ApiError>;

    /// Flip the server-side completion flag. The response body is opaque.
    async fn toggle_problem(&self, problem_id: &str) -> Result<(), ApiError>;
    async fn progress(&self) -> Result<ProgressSummary, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, session: SessionContext) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authed(request).send().await?;
        let status = response.status();
        debug!(url = %response.url(), %status, "api response");

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(ApiError::HttpStatus { status, message });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        Ok(self.execute(request).await?.json().await?)
    }
}

#[async_trait]
impl TrackerApi for HttpApi {
    async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        let request = self.client.post(self.url("/auth/register")).json(registration);
        let response: RegisterResponse = self.fetch(request).await?;
        Ok(response.into_user())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let request = self.client.post(self.url("/auth/login")).json(credentials);
        self.fetch(request).await
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.fetch(self.client.get(self.url("/auth/profile"))).await
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, ApiError> {
        self.fetch(self.client.get(self.url("/topics"))).await
    }

    async fn get_topic(&self, topic_id: &str) -> Result<Topic, ApiError> {
        let path = format!("/topics/{}", topic_id);
        self.fetch(self.client.get(self.url(&path))).await
    }

    async fn create_topic(&self, topic: &NewTopic) -> Result<Topic, ApiError> {
        self.fetch(self.client.post(self.url("/topics")).json(topic))
            .await
    }

    async fn list_problems(&self) -> Result<Vec<Problem>, ApiError> {
        self.fetch(self.client.get(self.url("/problems"))).await
    }

    async fn problems_for_topic(&self, topic_id: &str) -> Result<Vec<Problem>, ApiError> {
        let path = format!("/problems/topic/{}", topic_id);
        self.fetch(self.client.get(self.url(&path))).await
    }

    async fn create_problem(&self, problem: &NewProblem) -> Result<Problem, ApiError> {
        self.fetch(self.client.post(self.url("/problems")).json(problem))
            .await
    }

    async fn toggle_problem(&self, problem_id: &str) -> Result<(), ApiError> {
        let path = format!("/problems/{}/toggle", problem_id);
        self.execute(self.client.put(self.url(&path))).await?;
        Ok(())
    }

    async fn progress(&self) -> Result<ProgressSummary, ApiError> {
        self.fetch(self.client.get(self.url("/problems/user/progress")))
            .await
    }
}

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AdviceClientError;
use crate::session::Session;
use crate::{Advice, AdviceApi, Category, NewAdvice, ProfileUpdate, PublicUser, Registration};

#[derive(Clone)]
pub struct AdviceClientHttp {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    user: PublicUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    user: PublicUser,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct AdvicesResponse {
    advices: Vec<Advice>,
}

impl AdviceClientHttp {
    pub fn connect(endpoint: &str) -> Result<Self, AdviceClientError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AdviceClientError::InvalidRequest(format!(
                "server address must start with http:// or https://, got '{endpoint}'"
            )));
        }
        Ok(Self {
            client: Client::builder().build()?,
            base_url,
            token: None,
        })
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn with_session(mut self, session: Option<&Session>) -> Self {
        self.set_token(session.map(|s| s.access_token.clone()));
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, AdviceClientError> {
        let token = self.token.as_deref().ok_or(AdviceClientError::NotSignedIn)?;
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| AdviceClientError::InvalidRequest("malformed access token".into()))?;
        Ok(req.header(AUTHORIZATION, value))
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, AdviceClientError> {
    if resp.status().is_success() {
        Ok(resp.json().await?)
    } else {
        Err(AdviceClientError::from_http_response(resp).await)
    }
}

#[async_trait]
impl AdviceApi for AdviceClientHttp {
    async fn register(&self, registration: Registration) -> Result<PublicUser, AdviceClientError> {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(&registration)
            .send()
            .await?;
        let body: RegisterResponse = read_json(resp).await?;
        debug!(user_id = %body.user.id, "registered");
        Ok(body.user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, AdviceClientError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;
        let auth: AuthResponse = read_json(resp).await?;
        Ok(Session {
            user: auth.user,
            access_token: auth.access_token,
        })
    }

    async fn me(&self) -> Result<PublicUser, AdviceClientError> {
        let resp = self
            .authorized(self.client.get(self.url("/users/me")))?
            .send()
            .await?;
        read_json(resp).await
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<PublicUser, AdviceClientError> {
        if update.is_empty() {
            return Err(AdviceClientError::InvalidRequest(
                "nothing to update".into(),
            ));
        }
        let resp = self
            .authorized(self.client.put(self.url("/users/me")))?
            .json(&update)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn list_advices(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<Advice>, AdviceClientError> {
        let mut req = self.client.get(self.url("/advices"));
        if let Some(category) = category {
            req = req.query(&[("category", category.as_str())]);
        }
        let body: AdvicesResponse = read_json(req.send().await?).await?;
        Ok(body.advices)
    }

    async fn create_advice(&self, advice: NewAdvice) -> Result<Advice, AdviceClientError> {
        let resp = self
            .authorized(self.client.post(self.url("/advices")))?
            .json(&advice)
            .send()
            .await?;
        read_json(resp).await
    }
}

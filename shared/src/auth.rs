//! Client for the hosted auth provider.
//!
//! Authentication itself is delegated entirely to the provider; this
//! layer only verifies bearer tokens against its userinfo endpoint and
//! republishes the current auth state on a watch channel so consumers
//! can subscribe to `{user, is_loading}` changes. Dropping the receiver
//! unsubscribes.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The provider's notion of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Snapshot published on every auth-state change.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub is_loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }
}

#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build auth http client")?;
        let (state, _) = watch::channel(AuthState::default());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            state: Arc::new(state),
        })
    }

    /// Subscribes to auth-state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Verifies a bearer token. `None` covers both an invalid token and
    /// a provider failure; admin surfaces treat either as signed out.
    pub async fn verify(&self, bearer: &str) -> Option<AuthUser> {
        match self.try_verify(bearer).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!("auth verification failed: {err:#}");
                None
            },
        }
    }

    /// Re-resolves the current user and publishes the resulting state.
    pub async fn refresh(&self, bearer: Option<&str>) -> AuthState {
        let previous = self.state.borrow().user.clone();
        self.state.send_replace(AuthState {
            user: previous,
            is_loading: true,
        });

        let user = match bearer {
            Some(token) => self.verify(token).await,
            None => None,
        };
        let next = AuthState {
            user,
            is_loading: false,
        };
        self.state.send_replace(next.clone());
        next
    }

    async fn try_verify(&self, bearer: &str) -> Result<Option<AuthUser>> {
        let response = self
            .client
            .get(format!("{}/v1/user", self.base_url))
            .bearer_auth(bearer)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .context("auth request failed")?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let user = response
            .error_for_status()
            .context("auth request rejected")?
            .json::<AuthUser>()
            .await
            .context("invalid auth response")?;
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    #[tokio::test]
    async fn verify_resolves_the_signed_in_user() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "admin@example.com",
            })))
            .mount(&server)
            .await;

        let auth = AuthClient::new(&server.uri(), "secret")?;
        let user = auth.verify("token-1").await.expect("must resolve");
        assert_eq!(user.id, "u1");
        assert_eq!(user.display_name, None);
        Ok(())
    }

    #[tokio::test]
    async fn verify_treats_unauthorized_and_failures_as_signed_out() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let auth = AuthClient::new(&server.uri(), "secret")?;
        assert!(auth.verify("bad-token").await.is_none());

        let unreachable = AuthClient::new("http://127.0.0.1:1", "secret")?;
        assert!(unreachable.verify("token").await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_publishes_state_to_subscribers() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "admin@example.com",
            })))
            .mount(&server)
            .await;

        let auth = AuthClient::new(&server.uri(), "secret")?;
        let mut updates = auth.subscribe();
        assert!(updates.borrow().is_loading);

        let state = auth.refresh(Some("token-1")).await;
        assert!(!state.is_loading);
        assert!(state.user.is_some());

        updates.changed().await.ok();
        assert_eq!(*updates.borrow_and_update(), state);
        Ok(())
    }
}

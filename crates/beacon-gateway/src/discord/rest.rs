//! Minimal Discord REST client: user lookup and direct messages

use beacon_core::{BeaconError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Default REST base
pub const API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmChannel {
    pub id: String,
}

#[derive(Serialize)]
struct OpenDm<'a> {
    recipient_id: &'a str,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl RestClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("beacon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BeaconError::InvalidConfig(format!("rest client: {}", e)))?;

        Ok(Self {
            http,
            base: API_BASE.to_string(),
            token: token.into(),
        })
    }

    /// Point the client at another API base
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn user(&self, user_id: &str) -> Result<User> {
        let response = self
            .http
            .get(format!("{}/users/{}", self.base, user_id))
            .header("Authorization", &self.token)
            .send()
            .await
            .map_err(|e| BeaconError::Delivery(format!("fetch user: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BeaconError::RecipientNotFound(user_id.to_string())),
            _ => parse(response, "fetch user").await,
        }
    }

    pub async fn open_dm(&self, recipient_id: &str) -> Result<DmChannel> {
        let response = self
            .http
            .post(format!("{}/users/@me/channels", self.base))
            .header("Authorization", &self.token)
            .json(&OpenDm { recipient_id })
            .send()
            .await
            .map_err(|e| BeaconError::Delivery(format!("open dm: {}", e)))?;

        parse(response, "open dm").await
    }

    pub async fn create_message(&self, channel_id: &str, content: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/channels/{}/messages", self.base, channel_id))
            .header("Authorization", &self.token)
            .json(&CreateMessage { content })
            .send()
            .await
            .map_err(|e| BeaconError::Delivery(format!("send message: {}", e)))?;

        check(response, "send message").await.map(|_| ())
    }
}

async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(BeaconError::AuthenticationFailed(format!("{}: {}", action, body)));
    }
    Err(BeaconError::Delivery(format!("{}: {} {}", action, status, body)))
}

async fn parse<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> Result<T> {
    check(response, action)
        .await?
        .json::<T>()
        .await
        .map_err(|e| BeaconError::Serialization(format!("{}: {}", action, e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    pub(crate) struct Seen {
        pub(crate) auth: Mutex<Vec<String>>,
        pub(crate) messages: Mutex<Vec<(String, String)>>,
    }

    /// Local stand-in for the REST API: knows user 42 and records every send
    pub(crate) async fn fake_api() -> (String, Arc<Seen>) {
        async fn user(
            State(seen): State<Arc<Seen>>,
            headers: HeaderMap,
            Path(id): Path<String>,
        ) -> axum::response::Response {
            use axum::response::IntoResponse;
            if let Some(auth) = headers.get("authorization") {
                seen.auth.lock().push(auth.to_str().unwrap().to_string());
            }
            if id == "42" {
                Json(serde_json::json!({"id": "42", "username": "owner"})).into_response()
            } else {
                axum::http::StatusCode::NOT_FOUND.into_response()
            }
        }

        async fn open_dm(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
            Json(serde_json::json!({ "id": format!("dm-{}", body["recipient_id"].as_str().unwrap()) }))
        }

        async fn message(
            State(seen): State<Arc<Seen>>,
            Path(channel): Path<String>,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            let content = body["content"].as_str().unwrap().to_string();
            seen.messages.lock().push((channel, content));
            Json(serde_json::json!({"id": "m1"}))
        }

        let seen = Arc::new(Seen::default());
        let router = Router::new()
            .route("/users/:id", get(user))
            .route("/users/@me/channels", post(open_dm))
            .route("/channels/:id/messages", post(message))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn test_fetch_user_sends_token() {
        let (base, seen) = fake_api().await;
        let client = RestClient::new("secret").unwrap().with_base(base);

        let user = client.user("42").await.unwrap();
        assert_eq!(user.username, "owner");
        assert_eq!(seen.auth.lock().as_slice(), ["secret".to_string()]);
    }

    #[tokio::test]
    async fn test_bot_token_keeps_scheme() {
        let (base, seen) = fake_api().await;
        let client = RestClient::new("Bot secret").unwrap().with_base(base);

        client.user("42").await.unwrap();
        assert_eq!(seen.auth.lock().as_slice(), ["Bot secret".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (base, _) = fake_api().await;
        let client = RestClient::new("secret").unwrap().with_base(base);

        let err = client.user("404").await.unwrap_err();
        assert!(matches!(err, BeaconError::RecipientNotFound(id) if id == "404"));
    }

    #[tokio::test]
    async fn test_dm_round_trip() {
        let (base, seen) = fake_api().await;
        let client = RestClient::new("secret").unwrap().with_base(base);

        let channel = client.open_dm("42").await.unwrap();
        assert_eq!(channel.id, "dm-42");
        client.create_message(&channel.id, "hello").await.unwrap();

        assert_eq!(
            seen.messages.lock().as_slice(),
            [("dm-42".to_string(), "hello".to_string())]
        );
    }
}

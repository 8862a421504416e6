//! HTTP client for the GPTini REST API.
//!
//! Every response body is wrapped in a `{ "data": ... }` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{
        account::{Profile, TokenPair},
        message::ChatMessage,
        room::RoomSummary,
        MessageId, RoomId,
    },
    usecases::{
        list_rooms::{RoomsSource, RoomsSourceError},
        load_messages::{MessagesSource, MessagesSourceError},
        login::{LoginSource, LoginSourceError},
    },
};

const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const API_REQUEST_FAILED: &str = "API_REQUEST_FAILED";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request was not authorized")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("server unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected response body: {0}")]
    InvalidData(String),
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ApiError::Unavailable(error.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: None,
        })
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let request = self
            .http
            .post(self.url("/api/v1/auth/login"))
            .json(&LoginBody { email, password });

        self.execute(request).await
    }

    pub async fn me(&self) -> Result<Profile, ApiError> {
        self.execute(self.get("/api/v1/users/me")).await
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ApiError> {
        self.execute(self.get("/api/v1/chat/rooms")).await
    }

    /// Newest page of `room_id`'s history, or the page older than `before_id`.
    pub async fn fetch_messages(
        &self,
        room_id: RoomId,
        before_id: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let mut request = self.get(&format!("/api/v1/chat/rooms/{room_id}/messages"));
        if let Some(before_id) = before_id {
            request = request.query(&[("beforeId", before_id)]);
        }

        self.execute(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|error| {
            let error = error.without_url();
            tracing::warn!(code = API_REQUEST_FAILED, error = %error, "request failed");
            ApiError::Unavailable(error.to_string())
        })?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if let Some(error) = status_error(status) {
        tracing::debug!(code = API_REQUEST_FAILED, status = status.as_u16(), "request rejected");
        return Err(error);
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|error| ApiError::Unavailable(error.without_url().to_string()))?;

    serde_json::from_slice::<ApiEnvelope<T>>(&bytes)
        .map(|envelope| envelope.data)
        .map_err(|error| ApiError::InvalidData(error.to_string()))
}

fn status_error(status: StatusCode) -> Option<ApiError> {
    match status {
        status if status.is_success() => None,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Some(ApiError::NotFound),
        status => Some(ApiError::Unavailable(format!("HTTP {}", status.as_u16()))),
    }
}

#[async_trait]
impl RoomsSource for ApiClient {
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, RoomsSourceError> {
        ApiClient::list_rooms(self).await.map_err(|error| match error {
            ApiError::Unauthorized => RoomsSourceError::Unauthorized,
            ApiError::InvalidData(_) => RoomsSourceError::InvalidData,
            ApiError::NotFound | ApiError::Unavailable(_) => RoomsSourceError::Unavailable,
        })
    }
}

#[async_trait]
impl MessagesSource for ApiClient {
    async fn fetch_messages(
        &self,
        room_id: RoomId,
        before_id: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, MessagesSourceError> {
        ApiClient::fetch_messages(self, room_id, before_id)
            .await
            .map_err(|error| match error {
                ApiError::Unauthorized => MessagesSourceError::Unauthorized,
                ApiError::NotFound => MessagesSourceError::RoomNotFound,
                ApiError::InvalidData(_) => MessagesSourceError::InvalidData,
                ApiError::Unavailable(_) => MessagesSourceError::Unavailable,
            })
    }
}

#[async_trait]
impl LoginSource for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, LoginSourceError> {
        ApiClient::login(self, email, password)
            .await
            .map_err(map_login_error)
    }

    async fn profile(&self, access_token: &str) -> Result<Profile, LoginSourceError> {
        self.clone()
            .with_token(access_token)
            .me()
            .await
            .map_err(map_login_error)
    }
}

fn map_login_error(error: ApiError) -> LoginSourceError {
    match error {
        ApiError::Unauthorized => LoginSourceError::Unauthorized,
        ApiError::InvalidData(_) => LoginSourceError::InvalidData,
        ApiError::NotFound | ApiError::Unavailable(_) => LoginSourceError::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri()).expect("client should build")
    }

    #[tokio::test]
    async fn login_posts_credentials_and_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .and(body_json(json!({"email": "mina@gptini.org", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"accessToken": "acc", "refreshToken": "ref"}
            })))
            .mount(&server)
            .await;

        let tokens = client(&server)
            .login("mina@gptini.org", "pw")
            .await
            .expect("login should succeed");

        assert_eq!(tokens.access_token, "acc");
        assert_eq!(tokens.refresh_token, "ref");
    }

    #[tokio::test]
    async fn bearer_token_is_sent_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/me"))
            .and(header("authorization", "Bearer acc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"id": 5, "nickname": "mina"}})),
            )
            .mount(&server)
            .await;

        let profile = client(&server)
            .with_token("acc")
            .me()
            .await
            .expect("me should succeed");

        assert_eq!(
            profile,
            Profile {
                id: 5,
                nickname: "mina".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn list_rooms_decodes_optional_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/chat/rooms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": 1, "name": "general", "lastMessage": "hi", "unreadCount": 2},
                    {"id": 2, "name": "quiet"}
                ]
            })))
            .mount(&server)
            .await;

        let rooms = client(&server)
            .list_rooms()
            .await
            .expect("list should succeed");

        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].unread_count, 2);
        assert_eq!(rooms[1].last_message, None);
        assert_eq!(rooms[1].unread_count, 0);
    }

    #[tokio::test]
    async fn fetch_messages_passes_before_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/chat/rooms/42/messages"))
            .and(query_param("beforeId", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "messageId": 99,
                    "roomId": 42,
                    "senderId": 7,
                    "senderNickname": "june",
                    "type": "TEXT",
                    "content": "older",
                    "createdAt": "2025-01-01T10:00:00"
                }]
            })))
            .mount(&server)
            .await;

        let messages = client(&server)
            .fetch_messages(42, Some(100))
            .await
            .expect("fetch should succeed");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_id, 99);
    }

    #[tokio::test]
    async fn unauthorized_and_forbidden_map_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/chat/rooms"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let api = client(&server);

        assert_eq!(api.list_rooms().await, Err(ApiError::Unauthorized));
        assert_eq!(api.me().await, Err(ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn missing_room_maps_to_room_not_found_for_history() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/chat/rooms/9/messages"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = MessagesSource::fetch_messages(&client(&server), 9, None).await;

        assert_eq!(result, Err(MessagesSourceError::RoomNotFound));
    }

    #[tokio::test]
    async fn server_error_is_unavailable_and_bad_body_is_invalid_data() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/chat/rooms"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/api/v1/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let api = client(&server);

        assert!(matches!(api.list_rooms().await, Err(ApiError::Unavailable(_))));
        assert!(matches!(api.me().await, Err(ApiError::InvalidData(_))));
    }

    #[tokio::test]
    async fn profile_lookup_uses_given_token() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/users/me"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"id": 8, "nickname": "ren"}})),
            )
            .mount(&server)
            .await;

        let profile = LoginSource::profile(&client(&server), "fresh")
            .await
            .expect("profile should resolve");

        assert_eq!(profile.id, 8);
    }
}

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::{ChatBackend, EventStream};
use crate::error::{Error, Result};
use crate::observability::{
    BACKEND_REQUEST_DURATION, BACKEND_REQUEST_ERRORS, BACKEND_REQUESTS, STREAM_OPENED,
};
use crate::sse::process_sse;
use crate::types::{
    ChatHistory, ChatReply, ChatRequest, SessionCreated, SessionId, SessionList,
};

/// Where a locally running chat backend listens by default.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Creates a session up front.
    pub session: String,
    /// Registers a message (POST) and serves its push-stream (GET `/{id}`).
    pub stream: String,
    /// Single-shot chat.
    pub chat: String,
    /// Per-session history (GET `/{id}`).
    pub history: String,
    /// Session listing.
    pub sessions: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            session: "chat/session".to_string(),
            stream: "chat/stream".to_string(),
            chat: "api/chat".to_string(),
            history: "history".to_string(),
            sessions: "sessions".to_string(),
        }
    }
}

/// Client for a chat backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: ReqwestClient,
    stream_client: ReqwestClient,
    base_url: Url,
    endpoints: Endpoints,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url` with default settings.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None, Endpoints::default())
    }

    /// Create a client with custom settings.
    ///
    /// `timeout` bounds the JSON endpoints.  Push-streams are only bounded by
    /// the connect timeout: a stalled stream stays open until the transport
    /// gives up.
    pub fn with_options(
        base_url: &str,
        timeout: Option<Duration>,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::url(format!("{base_url} cannot be a base URL"), None));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        let stream_client = ReqwestClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            stream_client,
            base_url,
            endpoints,
            timeout,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path, optionally followed by a session segment.
    fn endpoint(&self, path: &str, session: Option<&SessionId>) -> Result<Url> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if let Some(session) = session {
            let message = format!("{url} cannot take a path segment");
            url.path_segments_mut()
                .map_err(|_| Error::url(message, None))?
                .pop_if_empty()
                .push(session.as_str());
        }
        Ok(url)
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process error responses and convert them to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let resource = response.url().path().to_string();

        #[derive(Deserialize)]
        struct ErrorResponse {
            detail: Option<serde_json::Value>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        // FastAPI-style bodies carry `detail` as a string or a list of problems.
        let message = match serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.detail)
        {
            Some(serde_json::Value::String(detail)) => detail,
            Some(detail) => detail.to_string(),
            None if error_body.is_empty() => format!("HTTP {status_code}"),
            None => error_body,
        };

        match status_code {
            400 | 422 => Error::bad_request(message),
            404 => Error::not_found(message, Some(resource)),
            408 => Error::timeout(message, None),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(message),
            _ => Error::api(status_code, message),
        }
    }

    /// Send a request and decode its JSON body, recording request metrics.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        BACKEND_REQUESTS.click();
        let start = Instant::now();
        let result = self.send_json_inner(request).await;
        BACKEND_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if result.is_err() {
            BACKEND_REQUEST_ERRORS.click();
        }
        result
    }

    async fn send_json_inner<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .headers(Self::default_headers())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpBackend {
    async fn create_session(&self) -> Result<SessionId> {
        let url = self.endpoint(&self.endpoints.session, None)?;
        let created: SessionCreated = self
            .send_json(self.client.post(url).json(&serde_json::json!({})))
            .await?;
        Ok(created.session_id)
    }

    async fn start_stream(&self, request: &ChatRequest) -> Result<SessionId> {
        let url = self.endpoint(&self.endpoints.stream, None)?;
        let created: SessionCreated = self.send_json(self.client.post(url).json(request)).await?;
        Ok(created.session_id)
    }

    async fn open_stream(
        &self,
        session: &SessionId,
        message: Option<&str>,
    ) -> Result<EventStream> {
        let mut url = self.endpoint(&self.endpoints.stream, Some(session))?;
        if let Some(message) = message {
            url.query_pairs_mut().append_pair("message", message);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        BACKEND_REQUESTS.click();
        let response = self
            .stream_client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                BACKEND_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            BACKEND_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        STREAM_OPENED.click();
        Ok(Box::pin(process_sse(response.bytes_stream())))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.endpoint(&self.endpoints.chat, None)?;
        self.send_json(self.client.post(url).json(request)).await
    }

    async fn history(&self, session: &SessionId) -> Result<ChatHistory> {
        let url = self.endpoint(&self.endpoints.history, Some(session))?;
        self.send_json(self.client.get(url)).await
    }

    async fn sessions(&self) -> Result<SessionList> {
        let url = self.endpoint(&self.endpoints.sessions, None)?;
        self.send_json(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = HttpBackend::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = HttpBackend::with_options(
            "https://chat.example.com/prefix",
            Some(Duration::from_secs(5)),
            Endpoints::default(),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://chat.example.com/prefix/");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(HttpBackend::new("mailto:someone@example.com").is_err());
        assert!(HttpBackend::new("not a url").is_err());
    }

    #[test]
    fn endpoint_resolution() {
        let client = HttpBackend::new("http://localhost:8000/app").unwrap();
        let session = SessionId::new("s1");

        assert_eq!(
            client.endpoint("chat/session", None).unwrap().as_str(),
            "http://localhost:8000/app/chat/session"
        );
        assert_eq!(
            client.endpoint("/chat/stream", Some(&session)).unwrap().as_str(),
            "http://localhost:8000/app/chat/stream/s1"
        );
        assert_eq!(
            client.endpoint("history/", Some(&session)).unwrap().as_str(),
            "http://localhost:8000/app/history/s1"
        );
    }

    #[test]
    fn session_ids_are_percent_encoded() {
        let client = HttpBackend::new(DEFAULT_BASE_URL).unwrap();
        let url = client
            .endpoint("chat/stream", Some(&SessionId::new("a/b c")))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/chat/stream/a%2Fb%20c");
    }

    #[test]
    fn endpoints_from_partial_yaml() {
        let endpoints: Endpoints = serde_yaml::from_str("chat: chat\n").unwrap();
        assert_eq!(endpoints.chat, "chat");
        assert_eq!(endpoints.stream, "chat/stream");
    }
}

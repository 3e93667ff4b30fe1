//! Authenticated session used by the API client
//!
//! [`Session`] is the seam between [`PeriApi`](super::PeriApi) and the
//! network. [`HttpSession`] is the real implementation.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use super::auth::TokenStore;
use super::error::{ApiError, ApiResult};
use super::models::FormField;
use crate::config::{Config, USERNAME_KEY};

/// Transport and configuration collaborator of the API client
#[async_trait]
pub trait Session: Send + Sync {
    /// Username of the account this session acts as
    fn name(&self) -> &str;

    /// Configuration mapping owned by the session
    fn config(&self) -> &Config;

    /// Mutable access to the configuration mapping
    fn config_mut(&mut self) -> &mut Config;

    /// POST `body` as JSON and decode the JSON response
    async fn post(&self, url: &str, body: Value) -> ApiResult<Value>;

    /// GET with `query` as URL parameters, returning the raw body whatever
    /// the status
    async fn get(&self, url: &str, query: &[(String, String)]) -> ApiResult<String>;

    /// POST `fields` as multipart/form-data and decode the JSON response
    async fn multipart_post(&self, url: &str, fields: &[FormField]) -> ApiResult<Value>;
}

/// Session backed by `reqwest`, authenticated with a stored session token
pub struct HttpSession {
    /// HTTP client
    client: Client,
    /// Account username
    name: String,
    /// Session token sent as `cookie`
    token: String,
    /// Configuration mapping
    config: Config,
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("name", &self.name)
            .field("token", &TokenStore::mask_token(&self.token))
            .field("config", &self.config.path())
            .finish()
    }
}

impl HttpSession {
    /// Create a session for `name` authenticated with `token`
    pub fn new(name: String, token: String, config: Config) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("periapi/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, name, token, config })
    }

    /// Create a session from the configured username and the keyring token
    pub fn from_config(config: Config) -> ApiResult<Self> {
        let name = config
            .get(USERNAME_KEY)
            .ok_or_else(|| {
                ApiError::Config(format!(
                    "'{}' is not set. Run `periapi set-token --username <name>` first",
                    USERNAME_KEY
                ))
            })?
            .to_string();
        let token = TokenStore::get_token()?;
        Self::new(name, token, config)
    }

    /// Map non-success statuses to API errors
    async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Api {
                status: 401,
                message: "Session token rejected".to_string(),
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api { status: status.as_u16(), message });
        }

        Ok(response)
    }
}

#[async_trait]
impl Session for HttpSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    async fn post(&self, url: &str, body: Value) -> ApiResult<Value> {
        let body = with_cookie(body, &self.token)?;
        let response = self.client.post(url).json(&body).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn get(&self, url: &str, query: &[(String, String)]) -> ApiResult<String> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("{}: status {}", url, status);
        }
        Ok(response.text().await?)
    }

    async fn multipart_post(&self, url: &str, fields: &[FormField]) -> ApiResult<Value> {
        let cookie = FormField::new("cookie", self.token.as_str());
        let form = fields
            .iter()
            .chain(std::iter::once(&cookie))
            .fold(Form::new(), |form, field| {
                form.part(field.name.clone(), Part::text(field.value.clone()).file_name(""))
            });

        let response = self.client.post(url).multipart(form).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Add the session token to a JSON object body
fn with_cookie(body: Value, token: &str) -> ApiResult<Value> {
    match body {
        Value::Object(mut map) => {
            map.insert("cookie".to_string(), Value::String(token.to_string()));
            Ok(Value::Object(map))
        }
        other => Err(ApiError::InvalidRequest(format!(
            "request body must be a JSON object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PeriApi;
    use crate::config::BASE_URL_KEY;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer a single HTTP request with `status` and `body`, yielding the
    /// raw request text
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/v2/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let headers = text[..header_end].to_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());

        match content_length {
            Some(len) => request.len() >= header_end + 4 + len,
            None if headers.contains("transfer-encoding: chunked") => text.ends_with("0\r\n\r\n"),
            None => true,
        }
    }

    fn session_for(base: &str) -> HttpSession {
        let mut config = Config::default();
        config.set(BASE_URL_KEY, base);
        HttpSession::new("alice".to_string(), "tok-123".to_string(), config).unwrap()
    }

    #[test]
    fn cookie_is_added_to_body() {
        let body = with_cookie(json!({"user_id": "42"}), "tok").unwrap();
        assert_eq!(body, json!({"user_id": "42", "cookie": "tok"}));
    }

    #[test]
    fn cookie_needs_object_body() {
        assert!(matches!(with_cookie(json!([1, 2]), "tok"), Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn session_creation() {
        let session =
            HttpSession::new("alice".to_string(), "token-value-1234".to_string(), Config::default())
                .unwrap();
        assert_eq!(session.name(), "alice");
        let debug = format!("{:?}", session);
        assert!(!debug.contains("token-value-1234"));
    }

    #[test]
    fn from_config_requires_username() {
        let err = HttpSession::from_config(Config::default()).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[tokio::test]
    async fn post_sends_cookie_in_json_body() {
        let (base, server) = serve_once("200 OK", r#"{"success":"true"}"#).await;
        let session = session_for(&base);

        let res = session.post(&format!("{}follow", base), json!({"user_id": "42"})).await.unwrap();
        assert_eq!(res, json!({"success": "true"}));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/v2/follow "), "{request}");
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let sent: Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent, json!({"user_id": "42", "cookie": "tok-123"}));
    }

    #[tokio::test]
    async fn multipart_sends_fields_and_cookie_with_empty_filenames() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let session = session_for(&base);
        let fields = vec![FormField::new("broadcast_id", "b1"), FormField::new("n_hearts", "3")];

        session.multipart_post(&format!("{}pingWatching", base), &fields).await.unwrap();

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(lower.contains("content-type: multipart/form-data; boundary="), "{request}");
        for name in ["broadcast_id", "n_hearts", "cookie"] {
            assert!(request.contains(&format!("name=\"{}\"; filename=\"\"", name)), "{request}");
        }
        assert!(request.contains("\r\n\r\nb1\r\n"), "{request}");
        assert!(request.contains("\r\n\r\ntok-123\r\n"), "{request}");
    }

    #[tokio::test]
    async fn unauthorized_post_is_token_rejected() {
        let (base, server) = serve_once("401 Unauthorized", "nope").await;
        let session = session_for(&base);

        let err = session.post(&format!("{}user", base), json!({})).await.unwrap_err();
        assert!(err.requires_reauth());
        assert_eq!(err.to_string(), "API error (401): Session token rejected");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let (base, server) = serve_once("500 Internal Server Error", "boom").await;
        let session = session_for(&base);

        let err = session.post(&format!("{}user", base), json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 500, ref message } if message == "boom"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn get_returns_raw_body_for_any_status() {
        let (base, server) = serve_once("404 Not Found", "<html>Not Found</html>").await;
        let session = session_for(&base);
        let query = vec![("broadcast_id".to_string(), "b1".to_string())];

        let body = session.get(&format!("{}getBroadcastPublic", base), &query).await.unwrap();
        assert_eq!(body, "<html>Not Found</html>");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/v2/getBroadcastPublic?broadcast_id=b1 "), "{request}");
        assert!(!request.contains("tok-123"));
    }

    #[tokio::test]
    async fn broadcast_info_is_none_for_html_not_found() {
        let (base, server) = serve_once("404 Not Found", "<html>Not Found</html>").await;
        let api = PeriApi::new(session_for(&base));

        assert_eq!(api.get_broadcast_info("b1").await.unwrap(), None);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn following_is_empty_for_html_body() {
        let (base, server) = serve_once("200 OK", "<html>oops</html>").await;
        let api = PeriApi::new(session_for(&base));

        assert_eq!(api.get_following("7").await.unwrap(), json!([]));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn following_is_empty_for_error_status() {
        let (base, server) = serve_once("503 Service Unavailable", "down").await;
        let api = PeriApi::new(session_for(&base));

        assert_eq!(api.get_following("7").await.unwrap(), json!([]));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn user_is_error_description_for_html_body() {
        let (base, server) = serve_once("200 OK", "<html>oops</html>").await;
        let api = PeriApi::new(session_for(&base));

        let res = api.get_user("7").await.unwrap();
        assert!(res.as_str().is_some_and(|s| s.starts_with("HTTP request failed")), "{res}");
        server.await.unwrap();
    }
}

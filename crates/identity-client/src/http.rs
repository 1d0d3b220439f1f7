//! reqwest implementation of [`IdentityApi`].

use crate::{
    Activity, ActivityLog, ApiError, ApiResult, AuthResponse, Credentials, HealthStatus,
    IdentityApi, RefreshResponse, TwoFactorStatus,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Error body the service sends with non-success statuses.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the identity service.
#[derive(Clone)]
pub struct HttpIdentityClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl HttpIdentityClient {
    /// Create a client for the service at `api_url` (e.g. `http://localhost:8080`).
    ///
    /// `timeout` bounds each request end to end; hitting it surfaces as
    /// [`ApiError::Network`].
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self::with_client(api_url, http_client))
    }

    /// Use an already configured reqwest client.
    pub fn with_client(api_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            api_url,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Send a request and turn any non-success status into [`ApiError::Rejected`].
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> ApiResult<reqwest::Response> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                // The URL can carry a verification token in its query.
                let e = e.without_url();
                warn!(operation, error = %e, "Identity service unreachable");
                ApiError::Network(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation, status = status.as_u16(), "Identity service request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());
        debug!(
            operation,
            status = status.as_u16(),
            has_message = message.is_some(),
            "Identity service rejected request"
        );
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> ApiResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.without_url().to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(operation, error = %e, "Identity service sent an undecodable body");
            ApiError::InvalidResponse(format!("{}: {}", operation, e))
        })
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityClient {
    async fn register(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let request = self.http_client.post(self.url("/auth/register")).json(credentials);
        let response = self.send(request, "register").await?;
        Self::decode(response, "register").await
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let request = self.http_client.post(self.url("/auth/login")).json(credentials);
        let response = self.send(request, "login").await?;
        Self::decode(response, "login").await
    }

    async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshResponse> {
        let request = self
            .http_client
            .post(self.url("/auth/refresh"))
            .json(&json!({ "refresh_token": refresh_token }));
        let response = self.send(request, "refresh").await?;
        Self::decode(response, "refresh").await
    }

    async fn logout(&self, access_token: &str) -> ApiResult<()> {
        let request = self
            .http_client
            .post(self.url("/auth/logout"))
            .bearer_auth(access_token)
            .header("Content-Type", "application/json");
        self.send(request, "logout").await?;
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> ApiResult<()> {
        let request = self
            .http_client
            .get(self.url("/auth/verify"))
            .query(&[("token", token)]);
        self.send(request, "verify_email").await?;
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let request = self
            .http_client
            .post(self.url("/auth/password/forgot"))
            .json(&json!({ "email": email }));
        self.send(request, "forgot_password").await?;
        Ok(())
    }

    async fn reset_password(&self, token: &str, password: &str) -> ApiResult<()> {
        let request = self
            .http_client
            .post(self.url("/auth/password/reset"))
            .json(&json!({ "token": token, "password": password }));
        self.send(request, "reset_password").await?;
        Ok(())
    }

    async fn activity_log(&self, access_token: &str) -> ApiResult<Vec<Activity>> {
        let request = self
            .http_client
            .get(self.url("/api/activity-log"))
            .bearer_auth(access_token);
        let response = self.send(request, "activity_log").await?;
        let log: ActivityLog = Self::decode(response, "activity_log").await?;
        Ok(log.activities)
    }

    async fn set_two_factor(
        &self,
        access_token: &str,
        enabled: bool,
    ) -> ApiResult<TwoFactorStatus> {
        let request = self
            .http_client
            .post(self.url("/api/2fa/toggle"))
            .bearer_auth(access_token)
            .json(&json!({ "enabled": enabled }));
        let response = self.send(request, "set_two_factor").await?;
        Self::decode(response, "set_two_factor").await
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        let response = self
            .http_client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.without_url().to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.without_url().to_string()))?;
        let body = serde_json::from_slice(&body).ok();
        Ok(HealthStatus { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpIdentityClient {
        HttpIdentityClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn auth_body() -> serde_json::Value {
        json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "user": {
                "id": "user-1",
                "email": "a@example.com",
                "email_verified": false,
                "created_at": "2024-03-01T10:00:00Z"
            }
        })
    }

    #[tokio::test]
    async fn test_login_sends_credentials_and_decodes_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "a@example.com", "password": "pw-123456"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .login(&Credentials::new("a@example.com", "pw-123456"))
            .await
            .unwrap();

        assert_eq!(response.access_token, "access-1");
        assert_eq!(response.refresh_token, "refresh-1");
        assert_eq!(response.user.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_register_created_status_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(auth_body()))
            .mount(&server)
            .await;

        let response = client(&server)
            .register(&Credentials::new("a@example.com", "pw-123456"))
            .await
            .unwrap();
        assert!(!response.user.email_verified);
    }

    #[tokio::test]
    async fn test_rejection_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .login(&Credentials::new("a@example.com", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Rejected {
                status: 401,
                message: Some("Invalid credentials".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_rejection_without_usable_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/password/forgot"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/password/reset"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": ""})))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.forgot_password("a@example.com").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.server_message(), None);

        let err = client.reset_password("tok", "new-password").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.server_message(), None);
    }

    #[tokio::test]
    async fn test_refresh_without_rotation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(json!({"refresh_token": "refresh-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-2"})))
            .mount(&server)
            .await;

        let response = client(&server).refresh("refresh-1").await.unwrap();
        assert_eq!(response.access_token, "access-2");
        assert_eq!(response.rotated_refresh_token(), None);
    }

    #[tokio::test]
    async fn test_success_with_undecodable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).refresh("refresh-1").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_logout_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("Authorization", "Bearer access-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Logged out successfully"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client(&server).logout("access-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_email_passes_token_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/verify"))
            .and(query_param("token", "verify-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).verify_email("verify-abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_activity_log_and_two_factor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/activity-log"))
            .and(header("Authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activities": [
                    {"id": 1, "type": "login", "description": "Successful login",
                     "timestamp": "2024-03-01T10:00:00Z", "ip": "127.0.0.1"},
                    {"id": 2, "type": "email", "description": "Email verified",
                     "timestamp": "2024-02-25T10:00:00Z"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/2fa/toggle"))
            .and(header("Authorization", "Bearer access-1"))
            .and(body_json(json!({"enabled": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "2FA settings updated",
                "enabled": true
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let activities = client.activity_log("access-1").await.unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(activities[1].kind, "email");

        let status = client.set_two_factor("access-1", true).await.unwrap();
        assert!(status.enabled);
        assert_eq!(status.message.as_deref(), Some("2FA settings updated"));
    }

    #[tokio::test]
    async fn test_health_reports_any_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let status = client(&server).health().await.unwrap();
        assert_eq!(status.status, 503);
        assert!(!status.is_healthy());
        assert_eq!(status.body, None);
    }

    #[tokio::test]
    async fn test_health_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
            .mount(&server)
            .await;

        let status = client(&server).health().await.unwrap();
        assert!(status.is_healthy());
        assert_eq!(status.body, Some(json!({"status": "healthy"})));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            HttpIdentityClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(!client.api_url().ends_with('/'));
        assert!(client.health().await.unwrap().is_healthy());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client =
            HttpIdentityClient::new(format!("http://127.0.0.1:{}", port), Duration::from_secs(5))
                .unwrap();

        let err = client.verify_email("secret-verify-token").await.unwrap_err();
        match err {
            ApiError::Network(message) => assert!(!message.contains("secret-verify-token")),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = HttpIdentityClient::new(server.uri(), Duration::from_millis(100)).unwrap();
        let err = client.refresh("refresh-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}

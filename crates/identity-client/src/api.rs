//! The identity service operations.

use crate::{
    Activity, ApiResult, AuthResponse, Credentials, HealthStatus, RefreshResponse,
    TwoFactorStatus,
};
use async_trait::async_trait;

/// Remote identity service.
///
/// Implementations are stateless: tokens are passed in by the caller and
/// nothing is remembered between calls.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// `POST /auth/register`
    async fn register(&self, credentials: &Credentials) -> ApiResult<AuthResponse>;

    /// `POST /auth/login`
    async fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse>;

    /// `POST /auth/refresh`
    async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshResponse>;

    /// `POST /auth/logout` with the access token as bearer.
    async fn logout(&self, access_token: &str) -> ApiResult<()>;

    /// `GET /auth/verify?token=...`
    async fn verify_email(&self, token: &str) -> ApiResult<()>;

    /// `POST /auth/password/forgot`
    async fn forgot_password(&self, email: &str) -> ApiResult<()>;

    /// `POST /auth/password/reset`
    async fn reset_password(&self, token: &str, password: &str) -> ApiResult<()>;

    /// `GET /api/activity-log` with the access token as bearer.
    async fn activity_log(&self, access_token: &str) -> ApiResult<Vec<Activity>>;

    /// `POST /api/2fa/toggle` with the access token as bearer.
    async fn set_two_factor(&self, access_token: &str, enabled: bool)
        -> ApiResult<TwoFactorStatus>;

    /// `GET /health`
    async fn health(&self) -> ApiResult<HealthStatus>;
}

//! Client for the GoAuth identity service.
//!
//! [`IdentityApi`] is the transport seam: one async method per remote
//! operation, each a single request/response exchange with no retries and
//! no state. [`HttpIdentityClient`] is the reqwest implementation.

mod api;
mod error;
mod http;
mod types;

pub use api::IdentityApi;
pub use error::{ApiError, ApiResult};
pub use http::HttpIdentityClient;
pub use types::{
    Activity, ActivityLog, AuthResponse, Credentials, HealthStatus, RefreshResponse,
    TwoFactorStatus, User,
};

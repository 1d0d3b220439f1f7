//! Behavioural tests for the session manager.
//!
//! - `harness.rs`    - fake identity service, failing storage, Harness
//! - `hydration.rs`  - startup restore from the session store
//! - `sign_in.rs`    - login and registration
//! - `logout.rs`     - unconditional local sign-out
//! - `refresh.rs`    - token refresh, coalescing, stale results
//! - `account.rs`    - password reset, verification, activity, 2FA
//! - `status.rs`     - subscriber notifications
//! - `end_to_end.rs` - HTTP client and file store against a mock server

mod refresh;

//! Session and credential lifecycle for the GoAuth client.
//!
//! This crate provides:
//! - [`SessionManager`]: login, registration, logout and token refresh, with
//!   the session persisted through a [`session_storage::SessionStore`]
//! - Coalesced token refresh: concurrent callers share one request
//! - An explicit rust-fsm state machine for the signed-in/signed-out phase
//! - Status snapshots for subscribers via a `tokio::sync::watch` channel

mod error;
mod manager;
mod session;
mod session_fsm;

#[cfg(test)]
mod tests;

pub use error::{AuthError, AuthResult, Precondition};
pub use manager::SessionManager;
pub use session::SessionSnapshot;
pub use session_fsm::session_machine;
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase};

pub use identity_client::{Activity, TwoFactorStatus, User};

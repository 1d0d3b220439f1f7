//! Session lifecycle state machine using rust-fsm.
//!
//! ```text
//!                 Restore / SignIn
//!   ┌───────────┐ ───────────────► ┌──────────┐
//!   │ SignedOut │                  │ SignedIn │ ◄─┐ SignIn / Refresh
//!   └───────────┘ ◄─────────────── └──────────┘ ──┘
//!     ▲      │     SignOut / Expire
//!     └──────┘
//!     SignOut
//! ```
//!
//! `SignedIn` holds exactly when the session has both an access token and a
//! user, so the machine and `SessionManager::is_authenticated` always agree.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(SignedOut)

    SignedOut => {
        // Complete record found in the store at startup
        Restore => SignedIn,
        SignIn => SignedIn,
        // Logout with nothing to clear still runs the cleanup
        SignOut => SignedOut
    },
    SignedIn => {
        SignIn => SignedIn,
        Refresh => SignedIn,
        SignOut => SignedOut,
        // Refresh token refused
        Expire => SignedOut
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Public view of the machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    SignedOut,
    SignedIn,
}

impl SessionPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionPhase::SignedIn)
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::SignedOut => SessionPhase::SignedOut,
            SessionMachineState::SignedIn => SessionPhase::SignedIn,
        }
    }
}

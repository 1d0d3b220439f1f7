//! In-memory session and the status view handed to subscribers.

use identity_client::User;
use serde::Serialize;
use session_storage::PersistedSession;
use std::fmt;

/// Tokens and user of the current sign-in.
///
/// `access_token` and `user` are set and cleared together; that pair is what
/// "authenticated" means. An empty token string counts as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub(crate) fn signed_in(user: User, access_token: String, refresh_token: String) -> Self {
        Self {
            user: Some(user),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
        }
    }

    /// Build a session from a stored record. Anything short of all three
    /// fields is no session.
    pub(crate) fn from_persisted(record: PersistedSession<User>) -> Option<Self> {
        record
            .into_complete()
            .map(|(access_token, refresh_token, user)| {
                Self::signed_in(user, access_token, refresh_token)
            })
    }

    pub(crate) fn to_persisted(&self) -> PersistedSession<User> {
        PersistedSession {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            user: self.user.clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.present_access_token().is_some()
    }

    pub(crate) fn present_access_token(&self) -> Option<&str> {
        non_empty(&self.access_token)
    }

    pub(crate) fn present_refresh_token(&self) -> Option<&str> {
        non_empty(&self.refresh_token)
    }
}

fn non_empty(token: &Option<String>) -> Option<&str> {
    token.as_deref().filter(|t| !t.is_empty())
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Derived status, published to subscribers on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Startup hydration has completed.
    pub ready: bool,
    pub authenticated: bool,
    pub user: Option<User>,
}

impl SessionSnapshot {
    pub(crate) fn new(ready: bool, session: &Session) -> Self {
        Self {
            ready,
            authenticated: session.is_authenticated(),
            user: session.user.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            email: "a@example.com".to_string(),
            email_verified: true,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_from_persisted_requires_every_field() {
        let complete = PersistedSession::new("a", "r", user());
        let session = Session::from_persisted(complete).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.refresh_token.as_deref(), Some("r"));

        let missing_refresh = PersistedSession {
            access_token: Some("a".to_string()),
            refresh_token: None,
            user: Some(user()),
        };
        assert!(Session::from_persisted(missing_refresh).is_none());

        let missing_user: PersistedSession<User> = PersistedSession {
            access_token: Some("a".to_string()),
            refresh_token: Some("r".to_string()),
            user: None,
        };
        assert!(Session::from_persisted(missing_user).is_none());
    }

    #[test]
    fn test_empty_tokens_count_as_absent() {
        let session = Session {
            user: Some(user()),
            access_token: Some(String::new()),
            refresh_token: Some(String::new()),
        };
        assert!(!session.is_authenticated());
        assert_eq!(session.present_access_token(), None);
        assert_eq!(session.present_refresh_token(), None);

        let record = PersistedSession::new("", "r", user());
        assert!(Session::from_persisted(record).is_none());
    }

    #[test]
    fn test_persisted_round_trip() {
        let session = Session::signed_in(user(), "a".to_string(), "r".to_string());
        let record = session.to_persisted();
        assert!(record.is_complete());
        assert_eq!(Session::from_persisted(record), Some(session));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let session = Session::signed_in(user(), "secret-a".to_string(), "secret-r".to_string());
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("secret-a"));
        assert!(!rendered.contains("secret-r"));
        assert!(rendered.contains("has_access_token: true"));
    }

    #[test]
    fn test_snapshot_of_empty_session() {
        let snapshot = SessionSnapshot::new(true, &Session::default());
        assert!(snapshot.ready);
        assert!(!snapshot.authenticated);
        assert!(snapshot.user.is_none());
    }
}

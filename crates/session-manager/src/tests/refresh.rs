//! Token refresh: preconditions, outcomes, coalescing and stale results.

use super::harness::{auth_response, refresh_response, rejected, test_user, Harness};
use crate::{AuthError, Precondition, SessionPhase};
use futures_util::future::join_all;
use identity_client::ApiError;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn refresh_without_refresh_token_makes_no_request() {
    let h = Harness::new();
    h.manager.initialize().await;

    let err = h.manager.refresh_access_token().await.unwrap_err();

    assert_eq!(err, AuthError::Precondition(Precondition::NoRefreshToken));
    assert_eq!(err.to_string(), "No refresh token");
    assert_eq!(h.api.total_calls(), 0);
}

#[tokio::test]
async fn refresh_without_rotation_keeps_refresh_token() {
    let h = Harness::signed_in().await;

    let token = h.manager.refresh_access_token().await.unwrap();

    assert_eq!(token, "access-2");
    assert_eq!(h.api.last_refresh_token.lock().unwrap().as_deref(), Some("refresh-1"));
    assert_eq!(h.manager.access_token().as_deref(), Some("access-2"));
    assert_eq!(h.manager.user(), Some(test_user("user-1")));

    let stored = h.stored();
    assert_eq!(stored.access_token.as_deref(), Some("access-2"));
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(stored.user, Some(test_user("user-1")));
    h.assert_consistent();
}

#[tokio::test]
async fn refresh_with_rotation_replaces_refresh_token() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Ok(refresh_response("access-2", Some("refresh-2"))));

    h.manager.refresh_access_token().await.unwrap();
    assert_eq!(h.stored().refresh_token.as_deref(), Some("refresh-2"));

    // The rotated token is the one sent next time.
    h.api.set_refresh(Ok(refresh_response("access-3", None)));
    h.manager.refresh_access_token().await.unwrap();
    assert_eq!(h.api.last_refresh_token.lock().unwrap().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn empty_rotated_token_counts_as_no_rotation() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Ok(refresh_response("access-2", Some(""))));

    h.manager.refresh_access_token().await.unwrap();

    assert_eq!(h.stored().refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn rejected_refresh_signs_out() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Err(rejected(401, Some("Invalid refresh token"))));

    let err = h.manager.refresh_access_token().await.unwrap_err();

    assert_eq!(
        err,
        AuthError::SessionExpired("Invalid refresh token".to_string())
    );
    assert_eq!(err.to_string(), "Token refresh failed: Invalid refresh token");
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.manager.phase(), SessionPhase::SignedOut);
    assert!(h.stored().is_empty());
    // The still-valid access token is revoked like a logout.
    assert_eq!(h.api.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.last_bearer.lock().unwrap().as_deref(), Some("access-1"));
    h.assert_consistent();
}

#[tokio::test]
async fn rejected_refresh_signs_out_when_revoke_fails() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Err(rejected(401, Some("Invalid refresh token"))));
    h.api
        .set_logout(Err(ApiError::Network("connection refused".to_string())));

    let err = h.manager.refresh_access_token().await.unwrap_err();

    assert!(matches!(err, AuthError::SessionExpired(_)));
    assert_eq!(h.api.logout_calls.load(Ordering::SeqCst), 1);
    assert!(!h.manager.is_authenticated());
    assert!(h.stored().is_empty());
}

#[tokio::test]
async fn refresh_with_empty_access_token_keeps_session() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Ok(refresh_response("", Some("refresh-2"))));

    let err = h.manager.refresh_access_token().await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidResponse(_)));
    assert_eq!(h.manager.access_token().as_deref(), Some("access-1"));
    assert_eq!(h.stored().refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn rejected_refresh_without_message_still_explains() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Err(rejected(403, None)));

    let err = h.manager.refresh_access_token().await.unwrap_err();

    assert!(matches!(err, AuthError::SessionExpired(_)));
    assert!(err.to_string().starts_with("Token refresh failed: "));
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn network_failure_keeps_session() {
    let h = Harness::signed_in().await;
    h.api
        .set_refresh(Err(ApiError::Network("connection reset".to_string())));

    let err = h.manager.refresh_access_token().await.unwrap_err();

    assert!(matches!(err, AuthError::Network(_)));
    assert!(err.is_transient());
    assert!(h.manager.is_authenticated());
    assert_eq!(h.manager.access_token().as_deref(), Some("access-1"));
    assert!(h.stored().is_complete());
}

#[tokio::test]
async fn undecodable_refresh_keeps_session() {
    let h = Harness::signed_in().await;
    h.api
        .set_refresh(Err(ApiError::InvalidResponse("expected value".to_string())));

    let err = h.manager.refresh_access_token().await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidResponse(_)));
    assert!(h.manager.is_authenticated());
    assert_eq!(h.stored().access_token.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn concurrent_refreshes_share_one_request() {
    let h = Harness::signed_in().await;
    let gate = h.api.hold_refresh();

    let callers = (0..5).map(|_| {
        let manager = h.manager.clone();
        async move { manager.refresh_access_token().await }
    });
    let release = async {
        h.api.refresh_started.notified().await;
        tokio::task::yield_now().await;
        gate.add_permits(1);
    };
    let (results, ()) = tokio::join!(join_all(callers), release);

    assert_eq!(h.api.refresh_count(), 1);
    for result in results {
        assert_eq!(result.unwrap(), "access-2");
    }
    assert_eq!(h.manager.access_token().as_deref(), Some("access-2"));
}

#[tokio::test]
async fn concurrent_callers_share_a_failure() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Err(rejected(401, Some("Invalid refresh token"))));
    let gate = h.api.hold_refresh();

    let callers = (0..3).map(|_| {
        let manager = h.manager.clone();
        async move { manager.refresh_access_token().await }
    });
    let release = async {
        h.api.refresh_started.notified().await;
        gate.add_permits(1);
    };
    let (results, ()) = tokio::join!(join_all(callers), release);

    assert_eq!(h.api.refresh_count(), 1);
    for result in results {
        assert!(matches!(result, Err(AuthError::SessionExpired(_))));
    }
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.api.logout_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn settled_refresh_frees_the_slot() {
    let h = Harness::signed_in().await;

    h.manager.refresh_access_token().await.unwrap();
    h.api.set_refresh(Ok(refresh_response("access-3", None)));
    let token = h.manager.refresh_access_token().await.unwrap();

    assert_eq!(token, "access-3");
    assert_eq!(h.api.refresh_count(), 2);
}

#[tokio::test]
async fn refresh_resolving_after_logout_is_discarded() {
    let h = Harness::signed_in().await;
    let gate = h.api.hold_refresh();

    let manager = h.manager.clone();
    let pending = tokio::spawn(async move { manager.refresh_access_token().await });
    h.api.refresh_started.notified().await;

    h.manager.logout().await;
    gate.add_permits(1);

    let result = pending.await.unwrap();
    assert_eq!(
        result,
        Err(AuthError::Precondition(Precondition::SessionChanged))
    );
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.manager.access_token(), None);
    assert!(h.stored().is_empty());
    h.assert_consistent();
}

#[tokio::test]
async fn stale_refresh_failure_keeps_newer_session() {
    let h = Harness::signed_in().await;
    h.api.set_refresh(Err(rejected(401, Some("Invalid refresh token"))));
    let gate = h.api.hold_refresh();

    let manager = h.manager.clone();
    let pending = tokio::spawn(async move { manager.refresh_access_token().await });
    h.api.refresh_started.notified().await;

    h.api.set_login(Ok(auth_response("user-2", "access-b", "refresh-b")));
    h.manager.login("user-2@example.com", "pw").await.unwrap();
    gate.add_permits(1);

    let result = pending.await.unwrap();
    assert_eq!(
        result,
        Err(AuthError::Precondition(Precondition::SessionChanged))
    );
    assert!(h.manager.is_authenticated());
    assert_eq!(h.manager.user(), Some(test_user("user-2")));
    assert_eq!(h.stored().access_token.as_deref(), Some("access-b"));
}

#[tokio::test]
async fn new_session_does_not_join_stale_refresh() {
    let h = Harness::signed_in().await;
    let gate = h.api.hold_refresh();

    let manager = h.manager.clone();
    let stale = tokio::spawn(async move { manager.refresh_access_token().await });
    h.api.refresh_started.notified().await;

    h.api.set_login(Ok(auth_response("user-2", "access-b", "refresh-b")));
    h.manager.login("user-2@example.com", "pw").await.unwrap();
    h.api.set_refresh(Ok(refresh_response("access-c", None)));

    let manager = h.manager.clone();
    let fresh = tokio::spawn(async move { manager.refresh_access_token().await });
    h.api.refresh_started.notified().await;
    assert_eq!(h.api.refresh_count(), 2);
    assert_eq!(h.api.last_refresh_token.lock().unwrap().as_deref(), Some("refresh-b"));

    gate.add_permits(2);
    assert_eq!(
        stale.await.unwrap(),
        Err(AuthError::Precondition(Precondition::SessionChanged))
    );
    assert_eq!(fresh.await.unwrap().unwrap(), "access-c");
    assert_eq!(h.manager.access_token().as_deref(), Some("access-c"));
}

#[tokio::test]
async fn refresh_applies_after_caller_gives_up() {
    let h = Harness::signed_in().await;
    let gate = h.api.hold_refresh();

    let outcome =
        tokio::time::timeout(Duration::from_millis(20), h.manager.refresh_access_token()).await;
    assert!(outcome.is_err());

    gate.add_permits(1);
    for _ in 0..100 {
        if h.manager.access_token().as_deref() == Some("access-2") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(h.manager.access_token().as_deref(), Some("access-2"));
    assert_eq!(h.stored().access_token.as_deref(), Some("access-2"));
    assert_eq!(h.api.refresh_count(), 1);
}

use crate::audit::AuditEventType;
use crate::error::ErrorCode;
use crate::security::TokenKind;
use crate::tests::common::{context, context_with, TestContext, TEST_PASSWORD};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

#[test_log::test(tokio::test)]
async fn register_login_validate() {
    let ctx = context().await;
    ctx.register("alice@example.com", "alice", TEST_PASSWORD).await;

    let outcome = ctx.login("alice@example.com", TEST_PASSWORD).await.unwrap();
    let claims = ctx
        .core
        .services
        .auth
        .validate_access_token(&outcome.access.token)
        .unwrap();

    assert_eq!(claims.email, "alice@example.com");
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.permissions, Vec::<String>::new());
    assert_eq!(claims.token_kind, TokenKind::Access);
    // Access lifetime is about 15 minutes from now
    let remaining = claims.exp - Utc::now().timestamp();
    assert!((890..=900).contains(&remaining), "remaining {}", remaining);

    assert_eq!(ctx.audit.count_of(AuditEventType::LoginSuccess), 1);
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    let ctx = context().await;
    ctx.register("Bob@Example.com", "bob", TEST_PASSWORD).await;

    ctx.login("bob@example.com", TEST_PASSWORD).await.unwrap();
    ctx.login("BOB@EXAMPLE.COM", TEST_PASSWORD).await.unwrap();
    ctx.login("bob", TEST_PASSWORD).await.unwrap();
}

#[tokio::test]
async fn unknown_user_and_wrong_password_fail_identically() {
    let ctx = context().await;
    ctx.register("carol@example.com", "carol", TEST_PASSWORD).await;

    let wrong = ctx.login("carol@example.com", "wrong-password").await.unwrap_err();
    let missing = ctx.login("ghost@example.com", "wrong-password").await.unwrap_err();

    assert_eq!(wrong.code, ErrorCode::InvalidCredentials);
    assert_eq!(missing.code, ErrorCode::InvalidCredentials);
    assert_eq!(wrong.message, missing.message);
}

#[test_log::test(tokio::test)]
async fn lockout_after_repeated_failures() {
    let ctx = context_with(|c| {
        c.max_failed_attempts = 3;
        c.lockout_duration_minutes = 1;
    })
    .await;
    let user = ctx.register("dave@example.com", "dave", TEST_PASSWORD).await;

    for _ in 0..3 {
        let err = ctx.login("dave@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
    }

    // Correct password, but the account is now locked
    let err = ctx.login("dave@example.com", TEST_PASSWORD).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AccountLocked);
    assert_eq!(ctx.audit.count_of(AuditEventType::AccountLocked), 1);

    let stored = ctx.repos.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_attempts, 3);
    assert!(stored.locked_until.unwrap() > Utc::now());
}

#[tokio::test]
async fn expired_lock_clears_on_successful_login() {
    let ctx = context().await;
    let user = ctx.register("erin@example.com", "erin", TEST_PASSWORD).await;

    // Put the account into a lock whose expiry has already passed
    ctx.repos
        .users
        .record_login_failure(user.id, 1, Duration::seconds(-1))
        .await
        .unwrap();
    let stored = ctx.repos.users.find_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.locked_until.is_some());
    assert!(!stored.is_locked());

    let outcome = ctx.login("erin@example.com", TEST_PASSWORD).await.unwrap();
    assert_eq!(outcome.user.failed_attempts, 0);
    assert!(outcome.user.locked_until.is_none());
    assert!(outcome.user.last_login_at.is_some());
}

#[tokio::test]
async fn refresh_rotates_the_refresh_token() {
    let ctx = context().await;
    ctx.register("frank@example.com", "frank", TEST_PASSWORD).await;
    let outcome = ctx.login("frank@example.com", TEST_PASSWORD).await.unwrap();
    let r1 = outcome.refresh.token.clone();

    let (a2, r2) = ctx
        .core
        .services
        .auth
        .refresh(&r1, &TestContext::client())
        .await
        .unwrap();

    // R1 is spent
    let err = ctx
        .core
        .services
        .auth
        .tokens()
        .validate(&r1, TokenKind::Refresh)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenRevoked);

    // The new pair works
    ctx.core
        .services
        .auth
        .validate_access_token(&a2.token)
        .unwrap();
    ctx.core
        .services
        .auth
        .tokens()
        .validate(&r2.token, TokenKind::Refresh)
        .unwrap();
}

#[tokio::test]
async fn refresh_fails_for_deactivated_users() {
    let ctx = context().await;
    let user = ctx.register("gail@example.com", "gail", TEST_PASSWORD).await;
    let outcome = ctx.login("gail@example.com", TEST_PASSWORD).await.unwrap();

    ctx.repos
        .users
        .update(
            user.id,
            crate::repository::UserChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = ctx
        .core
        .services
        .auth
        .refresh(&outcome.refresh.token, &TestContext::client())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AccountInactive);
}

#[tokio::test]
async fn logout_is_idempotent_and_revokes() {
    let ctx = context().await;
    ctx.register("hank@example.com", "hank", TEST_PASSWORD).await;
    let outcome = ctx.login("hank@example.com", TEST_PASSWORD).await.unwrap();
    let client = TestContext::client();

    ctx.core.services.auth.logout(&outcome.access.token, &client);
    let err = ctx
        .core
        .services
        .auth
        .validate_access_token(&outcome.access.token)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenRevoked);

    // Second logout is a no-op, not an error
    ctx.core.services.auth.logout(&outcome.access.token, &client);
    assert_eq!(ctx.audit.count_of(AuditEventType::Logout), 2);
}

#[tokio::test]
async fn change_password_invalidates_outstanding_tokens() {
    let ctx = context().await;
    let user = ctx.register("iris@example.com", "iris", TEST_PASSWORD).await;
    let outcome = ctx.login("iris@example.com", TEST_PASSWORD).await.unwrap();
    let client = TestContext::client();

    ctx.core
        .services
        .auth
        .change_password(user.id, TEST_PASSWORD, "Different!Horse7", &client)
        .await
        .unwrap();

    // Both tokens from before the change are dead
    for (token, kind) in [
        (&outcome.access.token, TokenKind::Access),
        (&outcome.refresh.token, TokenKind::Refresh),
    ] {
        let err = ctx
            .core
            .services
            .auth
            .tokens()
            .validate(token, kind)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenRevoked);
    }

    // Old password no longer works; the new one does
    let err = ctx.login("iris@example.com", TEST_PASSWORD).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidCredentials);
    ctx.login("iris@example.com", "Different!Horse7").await.unwrap();
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let ctx = context().await;
    let user = ctx.register("judy@example.com", "judy", TEST_PASSWORD).await;

    let err = ctx
        .core
        .services
        .auth
        .change_password(user.id, "not-the-password", "Different!Horse7", &TestContext::client())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidCredentials);
}

#[tokio::test]
async fn weak_new_password_is_rejected_on_change() {
    let ctx = context().await;
    let user = ctx.register("kate@example.com", "kate", TEST_PASSWORD).await;

    let err = ctx
        .core
        .services
        .auth
        .change_password(user.id, TEST_PASSWORD, "short", &TestContext::client())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let ctx = context().await;
    ctx.register("lena@example.com", "lena", TEST_PASSWORD).await;
    let outcome = ctx.login("lena@example.com", TEST_PASSWORD).await.unwrap();
    let client = TestContext::client();

    let reset = ctx
        .core
        .services
        .auth
        .initiate_password_reset("lena@example.com", &client)
        .await
        .unwrap();
    assert_eq!(reset.claims.token_kind, TokenKind::Reset);
    assert_eq!(ctx.audit.count_of(AuditEventType::PasswordResetInitiated), 1);

    ctx.core
        .services
        .auth
        .complete_password_reset(&reset.token, "Reset!Horse22", &client)
        .await
        .unwrap();

    // The reset token is single use
    let err = ctx
        .core
        .services
        .auth
        .complete_password_reset(&reset.token, "Another!Horse3", &client)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenRevoked);

    // Outstanding tokens from before the reset are dead
    let err = ctx
        .core
        .services
        .auth
        .validate_access_token(&outcome.access.token)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TokenRevoked);

    ctx.login("lena@example.com", "Reset!Horse22").await.unwrap();
}

#[tokio::test]
async fn login_rate_limit_rejects_before_repository_access() {
    let ctx = context_with(|c| {
        c.rate_limit_rps = 0.001;
        c.rate_limit_burst = 2;
    })
    .await;
    ctx.register("mia@example.com", "mia", TEST_PASSWORD).await;

    ctx.login("mia@example.com", TEST_PASSWORD).await.unwrap();
    ctx.login("mia@example.com", TEST_PASSWORD).await.unwrap();

    let err = ctx.login("mia@example.com", TEST_PASSWORD).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RateLimited);
    assert_eq!(ctx.audit.count_of(AuditEventType::RateLimited), 1);
}

#[tokio::test]
async fn email_verification_flow() {
    let ctx = context_with(|c| c.require_email_verification = true).await;
    let user = ctx.register("nina@example.com", "nina", TEST_PASSWORD).await;
    assert!(!user.email_verified);

    let verification = ctx
        .core
        .services
        .auth
        .initiate_email_verification(&user)
        .await
        .unwrap();

    let verified = ctx
        .core
        .services
        .auth
        .verify_email(&verification.token, &TestContext::client())
        .await
        .unwrap();
    assert!(verified.email_verified);
    assert!(verified.email_verified_at.is_some());
    assert_eq!(ctx.audit.count_of(AuditEventType::EmailVerified), 1);
}

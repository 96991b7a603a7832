use crate::domain::{NewOrganization, NewRole, RoleScope};
use crate::error::ErrorCode;
use crate::tests::common::{context, TestContext, TEST_PASSWORD};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn org_bound_editor_role_is_scoped() {
    let ctx = context().await;
    let user = ctx.register_random().await;

    let o1 = ctx
        .repos
        .organizations
        .create(NewOrganization {
            name: "Org One".to_string(),
            slug: None,
            description: String::new(),
        })
        .await
        .unwrap();
    let o2 = ctx
        .repos
        .organizations
        .create(NewOrganization {
            name: "Org Two".to_string(),
            slug: None,
            description: String::new(),
        })
        .await
        .unwrap();

    let editor = ctx
        .repos
        .roles
        .create(NewRole {
            name: "editor".to_string(),
            description: String::new(),
            permissions: vec!["state:data:write".to_string()],
            scope: RoleScope::Organization,
        })
        .await
        .unwrap();

    let roles = &ctx.core.services.roles;
    roles.assign(user.id, editor.id, Some(o1.id)).await.unwrap();

    // Claims aggregate the union across every binding
    let outcome = ctx.login(&user.email, TEST_PASSWORD).await.unwrap();
    assert!(outcome
        .access
        .claims
        .permissions
        .contains(&"state:data:write".to_string()));

    // The role contributes in O1, not in O2 or globally
    assert_eq!(roles.roles_of(user.id, Some(o1.id)).await.unwrap().len(), 1);
    assert!(roles.roles_of(user.id, Some(o2.id)).await.unwrap().is_empty());
    assert!(roles.roles_of(user.id, None).await.unwrap().is_empty());

    // The gate enforces the same scoping
    let client = TestContext::client();
    ctx.core
        .services
        .gate
        .authorize(
            &outcome.access.token,
            "state:data:write",
            Some(o1.id),
            "req-1",
            &client.client_id,
        )
        .await
        .unwrap();
    let err = ctx
        .core
        .services
        .gate
        .authorize(
            &outcome.access.token,
            "state:data:write",
            Some(o2.id),
            "req-2",
            &client.client_id,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
}

#[tokio::test]
async fn assign_is_idempotent_per_tuple() {
    let ctx = context().await;
    let user = ctx.register_random().await;

    let role = ctx
        .repos
        .roles
        .create(NewRole {
            name: "viewer".to_string(),
            description: String::new(),
            permissions: vec!["user:read".to_string()],
            scope: RoleScope::Global,
        })
        .await
        .unwrap();

    ctx.core.services.roles.assign(user.id, role.id, None).await.unwrap();
    ctx.core.services.roles.assign(user.id, role.id, None).await.unwrap();

    let assignments = ctx.repos.roles.assignments_of(user.id).await.unwrap();
    assert_eq!(assignments.len(), 1);
}

#[tokio::test]
async fn duplicate_permissions_across_roles_deduplicate() {
    let ctx = context().await;
    let user = ctx.register_random().await;

    for name in ["first", "second"] {
        let role = ctx
            .repos
            .roles
            .create(NewRole {
                name: name.to_string(),
                description: String::new(),
                permissions: vec!["user:read".to_string(), "user:list".to_string()],
                scope: RoleScope::Global,
            })
            .await
            .unwrap();
        ctx.core.services.roles.assign(user.id, role.id, None).await.unwrap();
    }

    let outcome = ctx.login(&user.email, TEST_PASSWORD).await.unwrap();
    let mut permissions = outcome.access.claims.permissions.clone();
    permissions.sort();
    assert_eq!(permissions, vec!["user:list", "user:read"]);
}

#[tokio::test]
async fn role_deletion_is_blocked_while_assigned() {
    let ctx = context().await;
    let user = ctx.register_random().await;

    let role = ctx
        .repos
        .roles
        .create(NewRole {
            name: "pending-delete".to_string(),
            description: String::new(),
            permissions: vec!["user:read".to_string()],
            scope: RoleScope::Global,
        })
        .await
        .unwrap();
    ctx.core.services.roles.assign(user.id, role.id, None).await.unwrap();

    let err = ctx.core.services.roles.delete(role.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DependentRecordsExist);

    ctx.core.services.roles.revoke(user.id, role.id, None).await.unwrap();
    ctx.core.services.roles.delete(role.id).await.unwrap();
}

#[tokio::test]
async fn revoking_a_role_takes_effect_without_cache_delay() {
    let ctx = context().await;
    let user = ctx.register_random().await;
    let token = ctx.grant_and_login(&user, &["user:read"]).await;
    let client = TestContext::client();

    // Warm the cache through the gate
    ctx.core
        .services
        .gate
        .authorize(&token, "user:read", None, "req-a", &client.client_id)
        .await
        .unwrap();

    // Revoke the contributing role
    let assignments = ctx.repos.roles.assignments_of(user.id).await.unwrap();
    for assignment in assignments {
        ctx.core
            .services
            .roles
            .revoke(user.id, assignment.role_id, assignment.organization_id)
            .await
            .unwrap();
    }

    // The very next check is computed from the new assignment set
    let err = ctx
        .core
        .services
        .gate
        .authorize(&token, "user:read", None, "req-b", &client.client_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
}

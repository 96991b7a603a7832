use crate::api::handlers::Dispatcher;
use crate::audit::MemoryAuditSink;
use crate::bootstrap::IdentityCore;
use crate::config::SecurityConfig;
use crate::domain::{NewRole, PermissionRegistry, RoleScope, User};
use crate::repository::Repositories;
use crate::services::{ClientInfo, LoginOutcome, RegisterUserInput};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::Fake;
use serde_json::{json, Value};
use std::sync::Arc;

pub const TEST_PASSWORD: &str = "Correct!Horse9";

pub struct TestContext {
    pub core: IdentityCore,
    pub repos: Repositories,
    pub audit: Arc<MemoryAuditSink>,
    pub registry: Arc<PermissionRegistry>,
    pub config: SecurityConfig,
}

impl TestContext {
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.core.dispatcher
    }

    pub fn client() -> ClientInfo {
        ClientInfo::from_ip("127.0.0.1")
    }

    /// Dispatch an operation with a stamped header.
    pub async fn request(&self, operation: &str, mut payload: Value) -> Value {
        payload["header"] = json!({
            "request_id": uuid::Uuid::new_v4().to_string(),
            "timestamp": chrono::Utc::now().timestamp(),
            "ip": "127.0.0.1",
        });
        self.core.dispatcher.dispatch(operation, payload).await
    }

    /// Register a user through the user service.
    pub async fn register(&self, email: &str, username: &str, password: &str) -> User {
        self.core
            .services
            .users
            .create(RegisterUserInput {
                email: email.to_string(),
                username: username.to_string(),
                password: password.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .expect("fixture user should register")
    }

    /// Register a random user.
    pub async fn register_random(&self) -> User {
        let email: String = SafeEmail().fake();
        let username: String = Username().fake();
        self.register(&email, &format!("{}{}", username, rand_suffix()), TEST_PASSWORD)
            .await
    }

    pub async fn login(&self, identifier: &str, password: &str) -> crate::error::Result<LoginOutcome> {
        self.core
            .services
            .auth
            .login(identifier, password, &Self::client())
            .await
    }

    /// Grant a user a global role carrying the given permissions and log
    /// them in. Returns the access token.
    pub async fn grant_and_login(&self, user: &User, permissions: &[&str]) -> String {
        let role = self
            .repos
            .roles
            .create(NewRole {
                name: format!("fixture-{}", rand_suffix()),
                description: String::new(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
                scope: RoleScope::Global,
            })
            .await
            .expect("fixture role should create");
        self.core
            .services
            .roles
            .assign(user.id, role.id, None)
            .await
            .expect("fixture assignment should succeed");

        let outcome = self
            .login(&user.email, TEST_PASSWORD)
            .await
            .expect("fixture login should succeed");
        outcome.access.token
    }

    /// An administrator holding the full built-in catalogue.
    pub async fn admin_token(&self) -> String {
        let admin = self.register_random().await;
        let all: Vec<&str> = crate::domain::permissions::ALL.to_vec();
        self.grant_and_login(&admin, &all).await
    }
}

fn rand_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Build a context with the default test configuration.
pub async fn context() -> TestContext {
    context_with(|_| {}).await
}

/// Build a context after tweaking the configuration.
pub async fn context_with(tweak: impl FnOnce(&mut SecurityConfig)) -> TestContext {
    let mut config = SecurityConfig::default();
    // Keep hashing fast under test
    config.bcrypt_cost = 1;
    // Generous default so only the dedicated test trips the limiter
    config.rate_limit_rps = 1000.0;
    config.rate_limit_burst = 1000;
    tweak(&mut config);

    let repos = Repositories::in_memory();
    let audit = Arc::new(MemoryAuditSink::new());
    let registry = Arc::new(PermissionRegistry::new());
    registry.register("state:data:write");

    let core = IdentityCore::build(
        &config,
        repos.clone(),
        registry.clone(),
        audit.clone(),
    )
    .expect("test core should assemble");

    TestContext {
        core,
        repos,
        audit,
        registry,
        config,
    }
}

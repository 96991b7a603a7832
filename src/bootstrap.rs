//! Process wiring
//!
//! Builds the core service graph from immutable configuration: revocation
//! set and its sweeper, rate limiter and its garbage collector, token and
//! RBAC engines, domain services, gate, and dispatcher. Shutdown drains
//! background tasks against a deadline.

use crate::api::handlers::{Dispatcher, Services};
use crate::audit::SharedAuditSink;
use crate::config::SecurityConfig;
use crate::domain::PermissionRegistry;
use crate::error::Result;
use crate::middleware::AuthorizationGate;
use crate::rbac::RbacEngine;
use crate::repository::Repositories;
use crate::security::{spawn_sweeper, PasswordHasher, RateLimiter, RevocationSet, TokenEngine};
use crate::services::{AuthService, OrganizationService, RoleService, UserService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const REVOCATION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);
const RATE_LIMIT_GC_INTERVAL: Duration = Duration::from_secs(600);

/// The assembled identity core plus its background tasks.
pub struct IdentityCore {
    pub dispatcher: Arc<Dispatcher>,
    pub services: Services,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl IdentityCore {
    /// Wire the service graph. Fails when the configuration would be
    /// unsafe to run (empty or sample keys, nonsensical limits).
    pub fn build(
        config: &SecurityConfig,
        repos: Repositories,
        registry: Arc<PermissionRegistry>,
        audit: SharedAuditSink,
    ) -> Result<Self> {
        config.validate()?;

        let revocations = Arc::new(RevocationSet::new());
        let tokens = Arc::new(TokenEngine::new(config, revocations.clone())?);
        let hasher = PasswordHasher::from_config(config)?;
        let rate_limiter = Arc::new(RateLimiter::from_config(config));

        let rbac = Arc::new(RbacEngine::new(
            repos.users.clone(),
            repos.roles.clone(),
            registry,
            Duration::from_secs(config.permission_cache_ttl_seconds),
        ));

        let auth = Arc::new(AuthService::new(
            config,
            repos.clone(),
            hasher.clone(),
            tokens.clone(),
            rbac.clone(),
            rate_limiter.clone(),
            audit.clone(),
        ));
        let users = Arc::new(UserService::new(
            repos.clone(),
            hasher,
            tokens.clone(),
            rbac.clone(),
            audit.clone(),
            config.allow_self_registration,
            config.require_email_verification,
        ));
        let organizations = Arc::new(OrganizationService::new(
            repos.clone(),
            rbac.clone(),
            audit.clone(),
        ));
        let roles = Arc::new(RoleService::new(repos, rbac.clone(), audit.clone()));
        let gate = Arc::new(AuthorizationGate::new(tokens, rbac, audit));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            spawn_sweeper(revocations, REVOCATION_SWEEP_INTERVAL, shutdown_rx.clone()),
            rate_limiter.spawn_gc(RATE_LIMIT_GC_INTERVAL, shutdown_rx),
        ];

        let services = Services {
            auth,
            users,
            organizations,
            roles,
            gate,
        };
        let dispatcher = Arc::new(Dispatcher::new(services.clone()));

        info!("identity core assembled");
        Ok(Self {
            dispatcher,
            services,
            shutdown,
            tasks,
        })
    }

    /// Stop background tasks, waiting up to the deadline before aborting
    /// what remains.
    pub async fn shutdown(self, deadline: Duration) {
        let _ = self.shutdown.send(true);
        for mut task in self.tasks {
            if tokio::time::timeout(deadline, &mut task).await.is_err() {
                warn!("background task did not stop before the deadline; aborting");
                task.abort();
            }
        }
        info!("identity core stopped");
    }
}

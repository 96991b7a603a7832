use crate::domain::{canonicalize_email, NewUser, User};
use crate::error::{ApiError, Result};
use crate::repository::memory::paginate;
use crate::repository::{ListQuery, Page, SortOrder, UserChanges, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: HashMap<i64, User>,
}

impl Inner {
    fn live(&self) -> impl Iterator<Item = &User> {
        self.users.values().filter(|u| u.deleted_at.is_none())
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.live()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.live()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn get_live_mut(&mut self, id: i64) -> Result<&mut User> {
        self.users
            .get_mut(&id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(ApiError::user_not_found)
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    inner: RwLock<Inner>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, new: NewUser) -> Result<User> {
        let new = new.canonicalized();
        let mut inner = self.inner.write();

        if inner.email_taken(&new.email, None) {
            return Err(ApiError::conflict("Email already in use"));
        }
        if inner.username_taken(&new.username, None) {
            return Err(ApiError::conflict("Username already in use"));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_id,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            is_active: true,
            email_verified: new.email_verified,
            email_verified_at: new.email_verified.then_some(now),
            last_login_at: None,
            failed_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let inner = self.inner.read();
        let result = inner.live().find(|u| u.id == id).cloned();
        Ok(result)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = canonicalize_email(email);
        let inner = self.inner.read();
        let result = inner.live().find(|u| u.email == email).cloned();
        Ok(result)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read();
        let result = inner.live().find(|u| u.username == username).cloned();
        Ok(result)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let mut inner = self.inner.write();

        if let Some(email) = &changes.email {
            let email = canonicalize_email(email);
            if inner.email_taken(&email, Some(id)) {
                return Err(ApiError::conflict("Email already in use"));
            }
        }
        if let Some(username) = &changes.username {
            if inner.username_taken(username, Some(id)) {
                return Err(ApiError::conflict("Username already in use"));
            }
        }

        let user = inner.get_live_mut(id)?;
        if let Some(email) = changes.email {
            user.email = canonicalize_email(&email);
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let user = inner.get_live_mut(id)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn record_login_success(&self, id: i64, at: DateTime<Utc>) -> Result<User> {
        let mut inner = self.inner.write();
        let user = inner.get_live_mut(id)?;
        user.failed_attempts = 0;
        user.locked_until = None;
        user.last_login_at = Some(at);
        user.updated_at = at;
        Ok(user.clone())
    }

    async fn record_login_failure(
        &self,
        id: i64,
        max_attempts: i32,
        lockout: Duration,
    ) -> Result<User> {
        let mut inner = self.inner.write();
        let user = inner.get_live_mut(id)?;
        let now = Utc::now();
        user.failed_attempts += 1;
        if user.failed_attempts >= max_attempts {
            user.locked_until = Some(now + lockout);
        }
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn mark_email_verified(&self, id: i64, at: DateTime<Utc>) -> Result<User> {
        let mut inner = self.inner.write();
        let user = inner.get_live_mut(id)?;
        user.mark_email_verified(at);
        user.updated_at = at;
        Ok(user.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        let user = inner.get_live_mut(id)?;
        user.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<User>> {
        let inner = self.inner.read();
        let mut users: Vec<User> = inner
            .live()
            .filter(|u| query.include_inactive || u.is_active)
            .cloned()
            .collect();

        let key = query.sort_by.as_deref().unwrap_or("id");
        users.sort_by(|a, b| {
            let ord = match key {
                "email" => a.email.cmp(&b.email),
                "username" => a.username.cmp(&b.username),
                "created_at" => a.created_at.cmp(&b.created_at),
                "last_login_at" => a.last_login_at.cmp(&b.last_login_at),
                _ => Ordering::Equal,
            };
            let ord = match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            // id tiebreak keeps pages disjoint under equal keys
            ord.then(a.id.cmp(&b.id))
        });

        Ok(paginate(users, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email_verified: false,
        }
    }

    #[tokio::test]
    async fn create_canonicalizes_and_rejects_duplicates() {
        let repo = MemoryUserRepository::new();
        let created = repo.create(new_user("Alice@Example.COM", "alice")).await.unwrap();
        assert_eq!(created.email, "alice@example.com");

        let dup = repo.create(new_user("ALICE@example.com", "alice2")).await;
        assert_eq!(dup.unwrap_err().code, crate::error::ErrorCode::Conflict);

        let dup = repo.create(new_user("other@example.com", "alice")).await;
        assert_eq!(dup.unwrap_err().code, crate::error::ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn soft_deleted_users_free_their_identifiers() {
        let repo = MemoryUserRepository::new();
        let user = repo.create(new_user("a@example.com", "a")).await.unwrap();
        repo.soft_delete(user.id).await.unwrap();

        assert!(repo.find_by_email("a@example.com").await.unwrap().is_none());
        repo.create(new_user("a@example.com", "a")).await.unwrap();
    }

    #[tokio::test]
    async fn login_failure_locks_at_threshold() {
        let repo = MemoryUserRepository::new();
        let user = repo.create(new_user("a@example.com", "a")).await.unwrap();

        for expected in 1..3 {
            let u = repo
                .record_login_failure(user.id, 3, Duration::minutes(15))
                .await
                .unwrap();
            assert_eq!(u.failed_attempts, expected);
            assert!(u.locked_until.is_none());
        }

        let locked = repo
            .record_login_failure(user.id, 3, Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(locked.failed_attempts, 3);
        assert!(locked.locked_until.unwrap() > Utc::now());

        let reset = repo.record_login_success(user.id, Utc::now()).await.unwrap();
        assert_eq!(reset.failed_attempts, 0);
        assert!(reset.locked_until.is_none());
        assert!(reset.last_login_at.is_some());
    }

    #[tokio::test]
    async fn list_filters_inactive_by_default() {
        let repo = MemoryUserRepository::new();
        let a = repo.create(new_user("a@example.com", "a")).await.unwrap();
        let b = repo.create(new_user("b@example.com", "b")).await.unwrap();
        repo.update(
            b.id,
            UserChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let page = repo.list(&ListQuery::default()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, a.id);

        let page = repo
            .list(&ListQuery {
                include_inactive: true,
                include_total: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(2));
    }
}

use crate::domain::{is_valid_slug, NewOrganization, Organization};
use crate::error::{ApiError, Result};
use crate::repository::memory::paginate;
use crate::repository::organization::OrganizationChanges;
use crate::repository::{ListQuery, OrganizationRepository, Page, SortOrder};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct Inner {
    next_id: i64,
    organizations: HashMap<i64, Organization>,
    // (user_id, organization_id), insertion-ordered
    memberships: Vec<(i64, i64)>,
}

impl Inner {
    fn live(&self) -> impl Iterator<Item = &Organization> {
        self.organizations
            .values()
            .filter(|o| o.deleted_at.is_none())
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.live().any(|o| o.name == name && Some(o.id) != except)
    }

    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.live().any(|o| o.slug == slug && Some(o.id) != except)
    }

    fn get_live_mut(&mut self, id: i64) -> Result<&mut Organization> {
        self.organizations
            .get_mut(&id)
            .filter(|o| o.deleted_at.is_none())
            .ok_or_else(ApiError::organization_not_found)
    }

    fn exists_live(&self, id: i64) -> bool {
        self.live().any(|o| o.id == id)
    }
}

#[derive(Default)]
pub struct MemoryOrganizationRepository {
    inner: RwLock<Inner>,
}

impl MemoryOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationRepository for MemoryOrganizationRepository {
    async fn create(&self, new: NewOrganization) -> Result<Organization> {
        let slug = new.effective_slug();
        if !is_valid_slug(&slug) {
            return Err(ApiError::validation(
                "Invalid organization slug",
                Some(serde_json::json!({"field": "slug", "value": slug})),
            ));
        }

        let mut inner = self.inner.write();
        if inner.name_taken(&new.name, None) {
            return Err(ApiError::conflict("Organization name already in use"));
        }
        if inner.slug_taken(&slug, None) {
            return Err(ApiError::conflict("Organization slug already in use"));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let organization = Organization {
            id: inner.next_id,
            name: new.name,
            slug,
            description: new.description,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>> {
        let inner = self.inner.read();
        let result = inner.live().find(|o| o.id == id).cloned();
        Ok(result)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let inner = self.inner.read();
        let result = inner.live().find(|o| o.slug == slug).cloned();
        Ok(result)
    }

    async fn update(&self, id: i64, changes: OrganizationChanges) -> Result<Organization> {
        let mut inner = self.inner.write();

        if let Some(name) = &changes.name {
            if inner.name_taken(name, Some(id)) {
                return Err(ApiError::conflict("Organization name already in use"));
            }
        }
        if let Some(slug) = &changes.slug {
            if !is_valid_slug(slug) {
                return Err(ApiError::validation(
                    "Invalid organization slug",
                    Some(serde_json::json!({"field": "slug", "value": slug})),
                ));
            }
            if inner.slug_taken(slug, Some(id)) {
                return Err(ApiError::conflict("Organization slug already in use"));
            }
        }

        let organization = inner.get_live_mut(id)?;
        if let Some(name) = changes.name {
            organization.name = name;
        }
        if let Some(slug) = changes.slug {
            organization.slug = slug;
        }
        if let Some(description) = changes.description {
            organization.description = description;
        }
        if let Some(is_active) = changes.is_active {
            organization.is_active = is_active;
        }
        organization.updated_at = Utc::now();
        Ok(organization.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        let organization = inner.get_live_mut(id)?;
        organization.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Organization>> {
        let inner = self.inner.read();
        let organizations = inner
            .live()
            .filter(|o| query.include_inactive || o.is_active)
            .cloned()
            .collect();
        Ok(paginate(sorted(organizations, query), query))
    }

    async fn search(&self, term: &str, query: &ListQuery) -> Result<Page<Organization>> {
        let needle = term.to_lowercase();
        let inner = self.inner.read();
        let organizations = inner
            .live()
            .filter(|o| query.include_inactive || o.is_active)
            .filter(|o| {
                o.name.to_lowercase().contains(&needle) || o.slug.contains(&needle)
            })
            .cloned()
            .collect();
        Ok(paginate(sorted(organizations, query), query))
    }

    async fn add_member(&self, organization_id: i64, user_id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.exists_live(organization_id) {
            return Err(ApiError::organization_not_found());
        }
        if !inner
            .memberships
            .iter()
            .any(|m| *m == (user_id, organization_id))
        {
            inner.memberships.push((user_id, organization_id));
        }
        Ok(())
    }

    async fn remove_member(&self, organization_id: i64, user_id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.exists_live(organization_id) {
            return Err(ApiError::organization_not_found());
        }
        inner.memberships.retain(|m| *m != (user_id, organization_id));
        Ok(())
    }

    async fn members(&self, organization_id: i64, query: &ListQuery) -> Result<Page<i64>> {
        let inner = self.inner.read();
        if !inner.exists_live(organization_id) {
            return Err(ApiError::organization_not_found());
        }
        let members: Vec<i64> = inner
            .memberships
            .iter()
            .filter(|(_, org)| *org == organization_id)
            .map(|(user, _)| *user)
            .collect();
        Ok(paginate(members, query))
    }

    async fn member_count(&self, organization_id: i64) -> Result<i64> {
        let inner = self.inner.read();
        Ok(inner
            .memberships
            .iter()
            .filter(|(_, org)| *org == organization_id)
            .count() as i64)
    }

    async fn remove_all_members(&self, organization_id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        inner.memberships.retain(|(_, org)| *org != organization_id);
        Ok(())
    }

    async fn organizations_of(&self, user_id: i64) -> Result<Vec<i64>> {
        let inner = self.inner.read();
        let live: HashSet<i64> = inner.live().map(|o| o.id).collect();
        Ok(inner
            .memberships
            .iter()
            .filter(|(user, org)| *user == user_id && live.contains(org))
            .map(|(_, org)| *org)
            .collect())
    }
}

fn sorted(mut organizations: Vec<Organization>, query: &ListQuery) -> Vec<Organization> {
    let key = query.sort_by.as_deref().unwrap_or("id");
    organizations.sort_by(|a, b| {
        let ord = match key {
            "name" => a.name.cmp(&b.name),
            "slug" => a.slug.cmp(&b.slug),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => Ordering::Equal,
        };
        let ord = match query.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        ord.then(a.id.cmp(&b.id))
    });
    organizations
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_org(name: &str) -> NewOrganization {
        NewOrganization {
            name: name.to_string(),
            slug: None,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn create_derives_slug_and_rejects_duplicates() {
        let repo = MemoryOrganizationRepository::new();
        let org = repo.create(new_org("Plant D Systems")).await.unwrap();
        assert_eq!(org.slug, "plant-d-systems");

        let dup = repo.create(new_org("Plant D Systems")).await;
        assert_eq!(dup.unwrap_err().code, crate::error::ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn membership_is_idempotent() {
        let repo = MemoryOrganizationRepository::new();
        let org = repo.create(new_org("Acme")).await.unwrap();

        repo.add_member(org.id, 7).await.unwrap();
        repo.add_member(org.id, 7).await.unwrap();
        assert_eq!(repo.member_count(org.id).await.unwrap(), 1);

        repo.remove_member(org.id, 7).await.unwrap();
        repo.remove_member(org.id, 7).await.unwrap();
        assert_eq!(repo.member_count(org.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_matches_name_and_slug() {
        let repo = MemoryOrganizationRepository::new();
        repo.create(new_org("Plant D Systems")).await.unwrap();
        repo.create(new_org("Acme Corp")).await.unwrap();

        let hits = repo
            .search("plant", &ListQuery::default())
            .await
            .unwrap();
        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].name, "Plant D Systems");
    }

    #[tokio::test]
    async fn organizations_of_skips_deleted_organizations() {
        let repo = MemoryOrganizationRepository::new();
        let a = repo.create(new_org("A")).await.unwrap();
        let b = repo.create(new_org("B")).await.unwrap();
        repo.add_member(a.id, 1).await.unwrap();
        repo.add_member(b.id, 1).await.unwrap();

        repo.soft_delete(b.id).await.unwrap();
        assert_eq!(repo.organizations_of(1).await.unwrap(), vec![a.id]);
    }
}

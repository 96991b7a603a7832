use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SLUG_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap());
static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// An organization. Name and slug are unique among non-deleted rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Parameters for creating an organization. When `slug` is absent it is
/// derived from the name.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub slug: Option<String>,
    pub description: String,
}

impl NewOrganization {
    /// The slug the organization will be stored under.
    pub fn effective_slug(&self) -> String {
        match &self.slug {
            Some(slug) => slug.clone(),
            None => slugify(&self.name),
        }
    }
}

/// Derive a URL-safe slug from a human name: lowercase, separators to
/// hyphens, strip everything outside [a-z0-9-], collapse hyphen runs, trim
/// leading and trailing hyphens.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let hyphenated = lowered.replace([' ', '_', '.', '/'], "-");
    let stripped = NON_SLUG_CHARS.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Whether a caller-supplied slug is well formed.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_SHAPE.is_match(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slugify_normalizes_whitespace_and_punctuation() {
        assert_eq!(slugify("  Acme  Corp!!  "), "acme-corp");
        assert_eq!(slugify("Plant D Systems"), "plant-d-systems");
        assert_eq!(slugify("a__b..c"), "a-b-c");
    }

    #[test]
    fn slugify_trims_hyphens() {
        assert_eq!(slugify("--edge--"), "edge");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_shape_validation() {
        assert!(is_valid_slug("acme-corp"));
        assert!(is_valid_slug("a"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("UPPER"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn effective_slug_prefers_explicit_value() {
        let org = NewOrganization {
            name: "Plant D Systems".to_string(),
            slug: Some("plant-d".to_string()),
            description: String::new(),
        };
        assert_eq!(org.effective_slug(), "plant-d");

        let derived = NewOrganization { slug: None, ..org };
        assert_eq!(derived.effective_slug(), "plant-d-systems");
    }
}

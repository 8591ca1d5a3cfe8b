//! Service catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog service entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    /// Rate per duration unit, in whole BDT
    pub base_rate: i32,
    pub active: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or updating a service
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub base_rate: i32,
    pub image_url: Option<String>,
}

impl ServiceInput {
    /// Validate the payload shape
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().len() < 2 {
            return Err("Title must be at least 2 characters long".to_string());
        }

        if !is_valid_slug(&self.slug) {
            return Err(
                "Slug must be lowercase letters, digits, and single hyphens".to_string(),
            );
        }

        if self.description.trim().is_empty() {
            return Err("Description is required".to_string());
        }

        if self.category.trim().is_empty() {
            return Err("Category is required".to_string());
        }

        if self.base_rate < 1 {
            return Err("Base rate must be a positive amount".to_string());
        }

        Ok(())
    }
}

fn is_valid_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return false;
    }

    slug.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ServiceInput {
        ServiceInput {
            title: "Elderly Care & Companionship".to_string(),
            slug: "elderly-care".to_string(),
            description: "In-home care for seniors".to_string(),
            category: "Elderly Care".to_string(),
            base_rate: 500,
            image_url: None,
        }
    }

    #[test]
    fn accepts_well_formed_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn rejects_bad_slugs() {
        for slug in ["", "Elderly Care", "elderly_care", "-elderly", "elderly-", "a--b"] {
            let mut i = input();
            i.slug = slug.to_string();
            assert!(i.validate().is_err(), "slug {:?} should be rejected", slug);
        }
    }

    #[test]
    fn rejects_non_positive_rate() {
        let mut i = input();
        i.base_rate = 0;
        assert!(i.validate().is_err());
        i.base_rate = -500;
        assert!(i.validate().is_err());
    }
}

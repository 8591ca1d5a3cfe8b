//! User models as seen by the API service
//!
//! The auth service owns registration and login; this service reads and
//! manages the same users table for profile updates and the admin surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account role. Stored as TEXT in the users table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub contact: Option<String>,
    pub nid: Option<String>,
    pub division: Option<String>,
    pub district: Option<String>,
    pub upazila: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin payload for editing a user
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdateInput {
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
    pub nid: Option<String>,
}

impl UserUpdateInput {
    /// Validate the payload shape
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;

        if !self.email.contains('@') {
            return Err("Invalid email format".to_string());
        }

        validate_optional_ids(self.contact.as_deref(), self.nid.as_deref())
    }
}

/// Self-service profile update payload
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdateInput {
    pub name: String,
    pub contact: Option<String>,
    pub nid: Option<String>,
}

impl ProfileUpdateInput {
    /// Validate the payload shape
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_optional_ids(self.contact.as_deref(), self.nid.as_deref())
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().len() < 2 {
        return Err("Name must be at least 2 characters long".to_string());
    }
    Ok(())
}

fn validate_optional_ids(contact: Option<&str>, nid: Option<&str>) -> Result<(), String> {
    if let Some(contact) = contact {
        if contact.len() != 11
            || !contact.starts_with("01")
            || !contact.chars().all(|c| c.is_ascii_digit())
        {
            return Err(
                "Contact must be an 11-digit mobile number starting with 01".to_string(),
            );
        }
    }

    if let Some(nid) = nid {
        if nid.len() != 13 || !nid.chars().all(|c| c.is_ascii_digit()) {
            return Err("NID must be exactly 13 digits".to_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!("MODERATOR".parse::<Role>().is_err());
    }

    #[test]
    fn profile_update_checks_id_formats() {
        let mut input = ProfileUpdateInput {
            name: "Fatema Begum".to_string(),
            contact: Some("01712345678".to_string()),
            nid: Some("1234567890123".to_string()),
        };
        assert!(input.validate().is_ok());

        input.contact = Some("0171234567".to_string());
        assert!(input.validate().is_err());

        input.contact = None;
        input.nid = Some("123456789012".to_string());
        assert!(input.validate().is_err());

        input.nid = None;
        input.name = "F".to_string();
        assert!(input.validate().is_err());
    }
}

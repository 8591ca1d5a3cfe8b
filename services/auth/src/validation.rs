//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.trim().len() < 2 {
        return Err("Name must be at least 2 characters long".to_string());
    }

    if name.len() > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a Bangladeshi mobile contact number (11 digits, 01 prefix)
pub fn validate_contact(contact: &str) -> Result<(), String> {
    static CONTACT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CONTACT_REGEX
        .get_or_init(|| Regex::new(r"^01\d{9}$").expect("Failed to compile contact regex"));

    if !regex.is_match(contact) {
        return Err("Contact must be an 11-digit mobile number starting with 01".to_string());
    }

    Ok(())
}

/// Validate a national ID number (13 digits)
pub fn validate_nid(nid: &str) -> Result<(), String> {
    static NID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        NID_REGEX.get_or_init(|| Regex::new(r"^\d{13}$").expect("Failed to compile NID regex"));

    if !regex.is_match(nid) {
        return Err("NID must be exactly 13 digits".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_requires_two_characters() {
        assert!(validate_name("").is_err());
        assert!(validate_name("A").is_err());
        assert!(validate_name("Ab").is_ok());
        assert!(validate_name("Fatema Begum").is_ok());
    }

    #[test]
    fn email_format_is_checked() {
        assert!(validate_email("user@care.xyz").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("@care.xyz").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn contact_must_be_eleven_digit_mobile() {
        assert!(validate_contact("01712345678").is_ok());
        assert!(validate_contact("0171234567").is_err());
        assert!(validate_contact("017123456789").is_err());
        assert!(validate_contact("02123456789").is_err());
        assert!(validate_contact("0171234567a").is_err());
    }

    #[test]
    fn nid_must_be_thirteen_digits() {
        assert!(validate_nid("1234567890123").is_ok());
        assert!(validate_nid("123456789012").is_err());
        assert!(validate_nid("12345678901234").is_err());
        assert!(validate_nid("123456789012x").is_err());
    }
}

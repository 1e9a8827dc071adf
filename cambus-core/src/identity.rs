use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::CoreError;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref CM_PHONE: Regex = Regex::new(r"^(237|00237|\+237)?[6-9]\d{8}$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

/// Cameroonian mobile number, optionally prefixed with the country code. Spaces are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    CM_PHONE.is_match(&compact)
}

/// Name shown for a user: their own, else the local part of the email, else "User".
pub fn display_name(name: Option<&str>, email: &str) -> String {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    match email.split('@').next().filter(|local| !local.is_empty()) {
        Some(local) => local.to_string(),
        None => "User".to_string(),
    }
}

/// Per-field validation messages, keyed like the sign-up form.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors(pub BTreeMap<&'static str, &'static str>);

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: &'static str) {
        self.0.entry(field).or_insert(message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.0.values().copied().collect();
        f.write_str(&messages.join("; "))
    }
}

impl From<FieldErrors> for CoreError {
    fn from(errors: FieldErrors) -> Self {
        CoreError::ValidationError(errors.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.full_name.trim().is_empty() {
            errors.add("full_name", "Full name is required");
        }

        if self.phone.trim().is_empty() {
            errors.add("phone", "Phone number is required");
        } else if !is_valid_phone(&self.phone) {
            errors.add("phone", "Please enter a valid Cameroonian phone number");
        }

        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Please enter a valid email address");
        }

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 6 characters");
        }

        if self.password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SignUpRequest {
        SignUpRequest {
            full_name: "Amina Njoya".to_string(),
            phone: "+237 677 123 456".to_string(),
            email: "amina@example.cm".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_valid_sign_up() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_phone_formats() {
        assert!(is_valid_phone("677123456"));
        assert!(is_valid_phone("237677123456"));
        assert!(is_valid_phone("00237 6 77 12 34 56"));
        assert!(!is_valid_phone("577123456"));
        assert!(!is_valid_phone("67712345"));
        assert!(!is_valid_phone("+33612345678"));
    }

    #[test]
    fn test_collects_every_field_error() {
        let req = SignUpRequest {
            full_name: " ".to_string(),
            phone: "12".to_string(),
            email: "not-an-email".to_string(),
            password: "abc".to_string(),
            confirm_password: "abcd".to_string(),
        };

        let errors = req.validate().unwrap_err();
        assert_eq!(errors.0.len(), 5);
        assert_eq!(errors.0["password"], "Password must be at least 6 characters");
        assert_eq!(errors.0["confirm_password"], "Passwords do not match");
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(display_name(Some("Amina"), "a@b.cm"), "Amina");
        assert_eq!(display_name(Some("  "), "tambe.peter@b.cm"), "tambe.peter");
        assert_eq!(display_name(None, "@b.cm"), "User");
        assert_eq!(display_name(None, ""), "User");
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let customer = Customer {
            id: Uuid::new_v4(),
            name: "Amina".to_string(),
            email: "amina@example.cm".to_string(),
            phone: None,
            password_hash: "$argon2id$...".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&customer).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}

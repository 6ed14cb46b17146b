// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::fields::{empty_as_none, timestamp, trimmed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Trainee,
    Trainer,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Trainee => "trainee",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
        }
    }

    /// Trainers and admins may author scenarios and grade submissions.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Trainer | Role::Admin)
    }
}

/// Represents a record of the 'users' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    pub email: String,

    /// Display name.
    pub name: String,

    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    pub role: Role,

    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    /// Argon2 password hash.
    /// Never serialized, so it cannot leak through API responses.
    #[serde(default, skip_serializing)]
    pub password_hash: String,

    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated: DateTime<Utc>,
}

/// Body written to the store when a user is created.
#[derive(Debug, Serialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub organization: String,
    pub password_hash: String,
}

/// DTO for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[serde(alias = "passwordConfirm")]
    pub password_confirm: String,
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters."))]
    pub name: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for an admin creating a user with an explicit role.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[validate(length(max = 100))]
    pub organization: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_hash_is_read_but_never_written() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "a@b.io",
            "name": "Ada",
            "avatar": "",
            "role": "trainer",
            "password_hash": "$argon2id$...",
            "created": "2024-01-01 00:00:00.000Z",
            "updated": "2024-01-01T00:00:00Z",
        }))
        .unwrap();

        assert_eq!(user.password_hash, "$argon2id$...");
        assert_eq!(user.avatar, None);
        assert!(user.role.is_staff());

        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("password_hash").is_none());
        assert_eq!(out["role"], "trainer");
    }

    #[test]
    fn register_accepts_camel_case_confirmation() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "new@simulex.io",
            "password": "longenough",
            "passwordConfirm": "longenough",
            "name": "New",
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.password_confirm, "longenough");
    }

    #[test]
    fn register_trims_email_before_validation() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "  Padded@SimulEx.io ",
            "password": "longenough",
            "password_confirm": "longenough",
            "name": "Pad",
        }))
        .unwrap();
        assert_eq!(req.email, "Padded@SimulEx.io");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn register_rejects_bad_email_and_short_password() {
        let req = RegisterRequest {
            email: "nope".into(),
            password: "short".into(),
            password_confirm: "short".into(),
            name: "X".into(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}

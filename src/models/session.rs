//! Sessions and sign-in credentials.

use crate::errors::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

/// The signed-in user as exposed to views.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

/// An issued session. Handlers resolve one per request from the bearer token
/// and pass it explicitly into every view and action.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

/// Validated email/password pair.
///
/// ## Invariants
/// - `email` is trimmed, lowercased and contains an `@` between non-empty parts.
/// - `password` is at least six characters and kept exactly as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn parse(email: &str, password: &str) -> Result<Self, ValidationError> {
        let normalized = email.trim().to_lowercase();
        match normalized.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(ValidationError::InvalidEmail),
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::ShortPassword {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(Self {
            email: normalized,
            password: password.to_string(),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

//! Accounts and privilege tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Privilege tier of an account, totally ordered `User < Admin < SuperAdmin`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    User,
    Admin,
    SuperAdmin,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::User => "user",
            Tier::Admin => "admin",
            Tier::SuperAdmin => "super_admin",
        }
    }

    /// Admin and super-admin accounts form the "admin family"
    pub fn is_admin_family(&self) -> bool {
        *self >= Tier::Admin
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Tier::User),
            "admin" => Ok(Tier::Admin),
            "super_admin" => Ok(Tier::SuperAdmin),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

/// Opaque stored credential; never serialized and redacted from `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: PasswordHash,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

/// Registration / admin-creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial account update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
    }
}

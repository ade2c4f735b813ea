//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::api::UserProfile;
use bazaar_core::{Email, Phone, UserId};

/// A storefront account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Phone,
    /// Admins land on `/admin` after login and may write the product file.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The subset of the account the client is allowed to see.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.as_str().to_owned(),
            is_admin: self.is_admin,
        }
    }
}

/// A validated account about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Phone,
    pub is_admin: bool,
}

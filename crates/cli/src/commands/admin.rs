//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli admin create -e admin@example.com -p admin123
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront

use thiserror::Error;

use bazaar_core::{Email, Phone, UserId};
use bazaar_storefront::db::{self, UserRepository};
use bazaar_storefront::models::NewUser;
use bazaar_storefront::services::{AuthError, AuthService};

use super::{EnvError, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Env(#[from] EnvError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validation, hashing or duplicate-email failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Command-line input for a new admin.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl AdminAccount {
    fn to_new_user(&self) -> Result<NewUser, AuthError> {
        Ok(NewUser {
            email: Email::parse(&self.email)?,
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            phone: Phone::parse(&self.phone)?,
            is_admin: true,
        })
    }
}

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Fails on invalid input, a taken email, or a database error.
pub async fn create_user(account: &AdminAccount) -> Result<UserId, AdminError> {
    let new_user = account.to_new_user()?;
    let database_url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!(email = %new_user.email, "Creating admin user");
    let users = UserRepository::new(&pool);
    let user = AuthService::new(&users)
        .create_user(&new_user, &account.password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account(email: &str, phone: &str) -> AdminAccount {
        AdminAccount {
            email: email.to_owned(),
            password: "admin123".to_owned(),
            first_name: " Store ".to_owned(),
            last_name: "Admin".to_owned(),
            phone: phone.to_owned(),
        }
    }

    #[test]
    fn test_new_user_is_admin() {
        let user = account("admin@example.com", "5550100")
            .to_new_user()
            .unwrap();
        assert!(user.is_admin);
        assert_eq!(user.first_name, "Store");
        assert_eq!(user.email.as_str(), "admin@example.com");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            account("not-an-email", "5550100").to_new_user(),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            account("admin@example.com", "x").to_new_user(),
            Err(AuthError::InvalidPhone(_))
        ));
    }
}

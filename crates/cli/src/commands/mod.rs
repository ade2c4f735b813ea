pub mod admin;
pub mod migrate;
pub mod products;

use secrecy::SecretString;

/// Errors shared by commands that need configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
}

/// `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`), after loading `.env`.
pub fn database_url() -> Result<SecretString, EnvError> {
    dotenvy::dotenv().ok();
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| EnvError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

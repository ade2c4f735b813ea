//! Bazaar CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bazaar-cli migrate
//!
//! # Create an admin account
//! bazaar-cli admin create -e admin@example.com -p admin123 \
//!     --first-name Store --last-name Admin --phone 5550100
//!
//! # Validate a product list and install it as the server product file
//! bazaar-cli products import catalog.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin users
//! - `products import` - Replace the server product file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage the server product file
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        #[arg(long, default_value = "Store")]
        first_name: String,

        #[arg(long, default_value = "Admin")]
        last_name: String,

        #[arg(long, default_value = "5550100")]
        phone: String,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// Validate a JSON array of products and write it to the product file
    Import {
        /// JSON file to import
        file: PathBuf,

        /// Destination (defaults to `STOREFRONT_PRODUCTS_FILE`)
        #[arg(long)]
        to: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                first_name,
                last_name,
                phone,
            } => {
                let account = commands::admin::AdminAccount {
                    email,
                    password,
                    first_name,
                    last_name,
                    phone,
                };
                commands::admin::create_user(&account).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductsAction::Import { file, to } => {
                commands::products::import(&file, to).await?;
            }
        },
    }
    Ok(())
}

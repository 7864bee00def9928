//! Medistore CLI - terminal storefront for the Medistore API.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! medistore catalog list --search aspirin --max 20
//! medistore catalog show 64f1c0a2
//! medistore catalog reviews 64f1c0a2
//!
//! # Sign in, then export the printed token
//! medistore login --email jane@example.com --password hunter2
//!
//! # Work with the cart
//! medistore cart add 64f1c0a2 --quantity 2
//! medistore cart dec 64f1c0a2
//!
//! # Place an order and review history
//! medistore checkout --street "1 Main St" --city Springfield --state IL --zip 62701
//! medistore orders list
//!
//! # Account
//! medistore catalog review 64f1c0a2 --rating 5 --comment "Worked fast"
//! medistore profile update --phone 555-0100
//! ```
//!
//! # Environment Variables
//!
//! See `medistore_storefront::config` for the full list; the most common are
//! `MEDISTORE_API_URL` and `MEDISTORE_API_TOKEN`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use medistore_core::{DeliveryAddress, MedicineId, Quantity};
use medistore_storefront::api::ProfileUpdate;
use medistore_storefront::config::StorefrontConfig;
use medistore_storefront::error::StoreError;
use medistore_storefront::state::AppState;

mod commands;
mod telemetry;
mod view;

use commands::CliError;
use commands::cart::CartIntent;

#[derive(Parser)]
#[command(name = "medistore")]
#[command(author, version, about = "Medistore terminal storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse medicines
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// View and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for everything in the cart
    Checkout {
        #[arg(long)]
        street: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        zip: String,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Sign in and print the session token
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show or change the signed-in user's profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List one page of medicines
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(short, long)]
        search: Option<String>,
        /// Lowest price to show (current page only)
        #[arg(long)]
        min: Option<Decimal>,
        /// Highest price to show (current page only)
        #[arg(long)]
        max: Option<Decimal>,
    },
    /// Show one medicine
    Show { id: String },
    /// List a medicine's reviews
    Reviews {
        id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Review a medicine
    Review {
        id: String,
        /// Stars, 1 to 5
        #[arg(short, long)]
        rating: u8,
        #[arg(short, long)]
        comment: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Change profile fields; unset fields keep their value
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        street: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a medicine
    Add {
        id: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set { id: String, quantity: u32 },
    /// Add one unit
    Inc { id: String },
    /// Remove one unit (removes the line at 1)
    Dec { id: String },
    /// Remove a line
    Remove { id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one order
    Show { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = StorefrontConfig::from_env();
    let sentry_guard = telemetry::init(
        config
            .as_ref()
            .ok()
            .and_then(|c| c.sentry_dsn.as_deref()),
    );

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::List {
                page,
                search,
                min,
                max,
            } => commands::catalog::list(&state, page, search, min, max).await?,
            CatalogAction::Show { id } => commands::catalog::show(&state, &id).await?,
            CatalogAction::Reviews { id, page } => {
                commands::catalog::reviews(&state, &id, page).await?;
            }
            CatalogAction::Review {
                id,
                rating,
                comment,
            } => commands::catalog::review(&state, &id, rating, &comment).await?,
        },
        Commands::Cart { action } => {
            commands::cart::run(&state, cart_intent(action)?).await?;
        }
        Commands::Checkout {
            street,
            city,
            state: region,
            zip,
        } => {
            let address = DeliveryAddress::new(&street, &city, &region, &zip);
            commands::orders::checkout(&state, address).await?;
        }
        Commands::Orders { action } => match action {
            OrdersAction::List { page } => commands::orders::list(&state, page).await?,
            OrdersAction::Show { id } => commands::orders::show(&state, &id).await?,
        },
        Commands::Login { email, password } => {
            commands::account::login(&state, &email, password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            phone,
        } => commands::account::register(&state, name, &email, password, phone).await?,
        Commands::Profile { action: None } => commands::account::profile(&state).await?,
        Commands::Profile {
            action: Some(action),
        } => commands::account::update_profile(&state, &profile_update(action)).await?,
    }
    Ok(())
}

/// Address flags are all-or-nothing; a partial address fails validation on
/// its first blank field.
fn profile_update(action: ProfileAction) -> ProfileUpdate {
    let ProfileAction::Update {
        name,
        phone,
        street,
        city,
        state,
        zip,
    } = action;

    let address = if street.is_none() && city.is_none() && state.is_none() && zip.is_none() {
        None
    } else {
        Some(DeliveryAddress::new(
            street.as_deref().unwrap_or_default(),
            city.as_deref().unwrap_or_default(),
            state.as_deref().unwrap_or_default(),
            zip.as_deref().unwrap_or_default(),
        ))
    };

    ProfileUpdate {
        name,
        phone,
        address,
    }
}

fn cart_intent(action: CartAction) -> Result<CartIntent, CliError> {
    let intent = match action {
        CartAction::Show => CartIntent::Show,
        CartAction::Add { id, quantity } => CartIntent::Add(
            MedicineId::new(id),
            Quantity::new(quantity).map_err(StoreError::from)?,
        ),
        CartAction::Set { id, quantity } => CartIntent::Set(MedicineId::new(id), quantity),
        CartAction::Inc { id } => CartIntent::Increment(MedicineId::new(id)),
        CartAction::Dec { id } => CartIntent::Decrement(MedicineId::new(id)),
        CartAction::Remove { id } => CartIntent::Remove(MedicineId::new(id)),
        CartAction::Clear => CartIntent::Clear,
    };
    Ok(intent)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cart_set_zero_is_passed_through() {
        let cli = Cli::try_parse_from(["medistore", "cart", "set", "med-1", "0"]).unwrap();
        let Commands::Cart { action } = cli.command else {
            panic!("expected cart command");
        };
        assert_eq!(
            cart_intent(action).unwrap(),
            CartIntent::Set(MedicineId::new("med-1"), 0)
        );
    }

    #[test]
    fn test_cart_add_zero_is_rejected() {
        let cli =
            Cli::try_parse_from(["medistore", "cart", "add", "med-1", "--quantity", "0"]).unwrap();
        let Commands::Cart { action } = cli.command else {
            panic!("expected cart command");
        };
        assert!(matches!(cart_intent(action), Err(CliError::Store(_))));
    }

    #[test]
    fn test_profile_update_partial_address() {
        let cli = Cli::try_parse_from([
            "medistore", "profile", "update", "--phone", "555-0100", "--city", "Springfield",
        ])
        .unwrap();
        let Commands::Profile {
            action: Some(action),
        } = cli.command
        else {
            panic!("expected profile update");
        };

        let update = profile_update(action);
        assert_eq!(update.phone.as_deref(), Some("555-0100"));
        assert_eq!(update.name, None);
        let address = update.address.unwrap();
        assert_eq!(address.city, "Springfield");
        assert!(address.validate().is_err());
    }

    #[test]
    fn test_profile_without_action_shows() {
        let cli = Cli::try_parse_from(["medistore", "profile"]).unwrap();
        assert!(matches!(cli.command, Commands::Profile { action: None }));
    }

    #[test]
    fn test_catalog_review_arguments() {
        let cli = Cli::try_parse_from([
            "medistore", "catalog", "review", "med-1", "-r", "4", "-c", "Good",
        ])
        .unwrap();
        let Commands::Catalog {
            action: CatalogAction::Review { id, rating, comment },
        } = cli.command
        else {
            panic!("expected catalog review");
        };
        assert_eq!((id.as_str(), rating, comment.as_str()), ("med-1", 4, "Good"));
    }

    #[test]
    fn test_catalog_price_bounds_parse_as_decimal() {
        let cli = Cli::try_parse_from([
            "medistore", "catalog", "list", "--search", "zinc", "--max", "12.50",
        ])
        .unwrap();
        let Commands::Catalog {
            action: CatalogAction::List { max, search, .. },
        } = cli.command
        else {
            panic!("expected catalog list");
        };
        assert_eq!(max, Some(Decimal::new(1250, 2)));
        assert_eq!(search.as_deref(), Some("zinc"));
    }
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use catalog_client::config::{ClientConfig, ConfigError};
use catalog_client::nav::{self, LogNavigator, Route};
use catalog_client::net::ClassifiedError;
use catalog_client::services::{AuthError, CatalogClient, LoginOutcome, NewProduct};
use catalog_client::session::Credentials;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client build failed: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] ClassifiedError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("not logged in; run `catalog login` first")]
    NotLoggedIn,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "catalog", about = "Product catalog API client")]
struct Cli {
    /// API base path; overrides `CATALOG_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    /// Session storage file; overrides `CATALOG_SESSION_FILE`.
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(CredentialArgs),
    Register(CredentialArgs),
    Logout,
    Whoami,
    Products(ProductsCommand),
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    email: String,

    #[arg(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct ProductsCommand {
    #[command(subcommand)]
    command: ProductsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProductsSubcommand {
    List,
    Get {
        id: i64,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        brand_id: i64,
        #[arg(long)]
        type_id: i64,
    },
    Brands,
    Types,
    Dashboard,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_base_url(api_url)?;
    }
    if let Some(session_file) = cli.session_file {
        config = config.with_session_file(session_file);
    }

    let client = CatalogClient::connect(&config, Arc::new(LogNavigator))?;

    match cli.command {
        Command::Login(args) => run_login(&client, args).await,
        Command::Register(args) => {
            client
                .auth
                .register(&Credentials::new(args.email, args.password))
                .await?;
            eprintln!("registered; run `catalog login` to sign in");
            Ok(())
        }
        Command::Logout => {
            client.auth.logout();
            Ok(())
        }
        Command::Whoami => {
            let user = client.auth.current_user().ok_or(CliError::NotLoggedIn)?;
            print_json(&user)
        }
        Command::Products(products) => run_products(&client, products).await,
    }
}

async fn run_login(client: &CatalogClient, args: CredentialArgs) -> Result<(), CliError> {
    let credentials = Credentials::new(args.email, args.password);
    match client.auth.login(&credentials).await? {
        LoginOutcome::LoggedIn(session) => print_json(&session.user),
        LoginOutcome::Superseded => {
            eprintln!("login superseded by a newer session change");
            Ok(())
        }
    }
}

async fn run_products(client: &CatalogClient, products: ProductsCommand) -> Result<(), CliError> {
    let route = match &products.command {
        ProductsSubcommand::Add { .. } => Route::AddProduct,
        ProductsSubcommand::Dashboard => Route::Dashboard,
        _ => Route::Products,
    };
    if nav::guard(route, client.auth.is_logged_in()) != route {
        return Err(CliError::NotLoggedIn);
    }

    let service = &client.products;
    match products.command {
        ProductsSubcommand::List => print_json(&service.list_products().await?),
        ProductsSubcommand::Get { id } => print_json(&service.get_product(id).await?),
        ProductsSubcommand::Add {
            name,
            price,
            description,
            brand_id,
            type_id,
        } => {
            let product = NewProduct { name, price, description, brand_id, product_type_id: type_id };
            print_json(&service.add_product(&product).await?)
        }
        ProductsSubcommand::Brands => print_json(&service.list_brands().await?),
        ProductsSubcommand::Types => print_json(&service.list_product_types().await?),
        ProductsSubcommand::Dashboard => print_json(&service.dashboard().await?),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

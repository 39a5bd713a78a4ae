//! Stockroom CLI - inventory and accounts from the terminal, or served over HTTP

use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use stockroom::config::{self, Settings, StockroomConfig};
use stockroom::storage::users::normalize_username;
use stockroom::storage::{CredentialStore, ProductStore};
use stockroom::ui::{self, Icons};
use stockroom::product::normalize_name;
use stockroom::password::hash_password;
use stockroom::ProductUpdate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(version)]
#[command(about = "Small inventory manager - users, sessions and a product catalog over SQLite")]
#[command(long_about = r#"
Stockroom keeps a product catalog and a list of accounts in two SQLite files.

Example usage:
  stockroom init --write-config
  stockroom register --username alice --password s3cret
  stockroom add --name widget --cost 1.50 --sell 2.75 --stock 40
  stockroom update --name widget --stock 0
  stockroom list
  stockroom serve --port 5000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the users database (overrides the config file)
    #[arg(long, global = true)]
    users_db: Option<PathBuf>,

    /// Path to the products database (overrides the config file)
    #[arg(long, global = true)]
    products_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create both databases if they are missing
    Init {
        /// Also write a stockroom.toml with the default settings
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Serve the web interface
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Register a new user
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Check a username and password
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Add a product to the catalog
    Add {
        /// Product name (stored uppercase)
        #[arg(short, long)]
        name: String,

        /// Cost price
        #[arg(long, allow_negative_numbers = true)]
        cost: f64,

        /// Selling price
        #[arg(long, allow_negative_numbers = true)]
        sell: f64,

        /// Units in stock
        #[arg(long, allow_negative_numbers = true)]
        stock: i64,
    },

    /// Change the price or stock of a product
    Update {
        #[arg(short, long)]
        name: String,

        #[arg(long, allow_negative_numbers = true)]
        cost: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        sell: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        stock: Option<i64>,
    },

    /// Remove a product from the catalog
    Remove {
        #[arg(short, long)]
        name: String,
    },

    /// List products
    List {
        /// Only print product names
        #[arg(long)]
        names: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show user and inventory statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = config::load_config(cli.config.as_deref())?;
    let mut settings = Settings::from_config(file_config.unwrap_or_default())?;
    if let Some(path) = cli.users_db.clone() {
        settings.users_database = path;
    }
    if let Some(path) = cli.products_db.clone() {
        settings.products_database = path;
    }

    init_logging(cli.verbose, &settings)?;

    if let Err(e) = run(cli, settings) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool, settings: &Settings) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    match &settings.log_file {
        Some(path) => {
            // Each run starts with an empty log
            let file = std::fs::File::create(path)?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::sync::Mutex::new(file)).with_ansi(false))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        }
    }
    Ok(())
}

fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { write_config, force } => {
            if write_config {
                let path = cli.config.clone().unwrap_or_else(config::default_config_path);
                config::write_config(&path, &StockroomConfig::with_defaults(), force)?;
                ui::info("Config", &path.display().to_string());
            }

            let users = CredentialStore::open(&settings.users_database)?;
            let products = ProductStore::open(&settings.products_database)?;

            ui::header(Icons::DATABASE, "Stores ready");
            ui::summary_row("Users:", &users.path().display().to_string());
            ui::summary_row("Products:", &products.path().display().to_string());
            if !users.has_any_users()? {
                ui::warn("No users yet - create the first account with `stockroom register`");
            }
        }

        Commands::Serve { port } => {
            let mut settings = settings;
            if let Some(port) = port {
                settings.port = port;
            }

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(stockroom::server::start_server(&settings))?;
        }

        Commands::Register { username, password } => {
            let users = CredentialStore::open(&settings.users_database)?;
            let hash = hash_password(&password)?;
            users.register(&username, &hash)?;
            ui::success(&format!("User '{}' registered", normalize_username(&username)?));
        }

        Commands::Login { username, password } => {
            let users = CredentialStore::open(&settings.users_database)?;
            let outcome = users.authenticate(&username, &password)?;

            if outcome.is_authenticated() {
                ui::success(&format!("{} Credentials match", Icons::KEY));
            } else if outcome.username_matched {
                anyhow::bail!("Incorrect password");
            } else {
                anyhow::bail!("No account registered with that username");
            }
        }

        Commands::Add { name, cost, sell, stock } => {
            let products = ProductStore::open(&settings.products_database)?;
            products.add(&name, cost, sell, stock)?;
            ui::success(&format!("Product '{}' added", normalize_name(&name)?));
        }

        Commands::Update { name, cost, sell, stock } => {
            let products = ProductStore::open(&settings.products_database)?;
            let update = ProductUpdate { cost_price: cost, sell_price: sell, in_stock: stock };

            if update.is_empty() {
                ui::warn("Nothing to update - pass --cost, --sell or --stock");
            } else if products.update(&name, update)? {
                ui::success(&format!("Product '{}' updated", normalize_name(&name)?));
            } else {
                anyhow::bail!("Product '{}' not found", normalize_name(&name)?);
            }
        }

        Commands::Remove { name } => {
            let products = ProductStore::open(&settings.products_database)?;
            products.remove(&name)?;
            ui::success(&format!("Product '{}' removed", normalize_name(&name)?));
        }

        Commands::List { names, format } => {
            let products = ProductStore::open(&settings.products_database)?;

            if names {
                let names = products.list_names()?;
                match format {
                    Format::Json => println!("{}", serde_json::to_string_pretty(&names)?),
                    Format::Text if names.is_empty() => println!("{} No products found.", Icons::EMPTY),
                    Format::Text => names.iter().for_each(|name| println!("{}", name)),
                }
                return Ok(());
            }

            let all = products.list_all()?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&all)?),
                Format::Text if all.is_empty() => println!("{} No products found.", Icons::EMPTY),
                Format::Text => {
                    ui::header(Icons::BOX, &format!("{} products", all.len()));
                    println!("{}", ui::product_table(&all));

                    let sold_out: Vec<&str> = all
                        .iter()
                        .filter(|p| p.in_stock == 0)
                        .map(|p| p.name.as_str())
                        .collect();
                    if !sold_out.is_empty() {
                        println!(
                            "{} Sold out: {}",
                            Icons::WARN,
                            sold_out.join(", ").style(ui::theme().out.sold_out.clone())
                        );
                    }
                }
            }
        }

        Commands::Stats => {
            let users = CredentialStore::open(&settings.users_database)?;
            let products = ProductStore::open(&settings.products_database)?;
            let stats = products.stats()?;

            ui::header(Icons::STATS, "Stockroom Statistics");
            println!(
                "{}",
                ui::stats_table(&[
                    ("Users", users.count()?.to_string()),
                    ("Products", stats.products.to_string()),
                    ("Units in stock", stats.units_in_stock.to_string()),
                    ("Stock value", format!("${:.2}", stats.stock_value)),
                    ("Potential revenue", format!("${:.2}", stats.potential_revenue)),
                ])
            );
            ui::section(&format!("{} Stores", Icons::PERSON));
            ui::summary_row("Users:", &users.path().display().to_string());
            ui::summary_row("Products:", &products.path().display().to_string());
        }
    }

    Ok(())
}

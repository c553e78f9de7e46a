use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use finfolio_core::providers::traits::QuoteKind;
use finfolio_server::api::admin::PriceKind;
use finfolio_server::config::ServerConfig;
use finfolio_server::server::start_server;
use finfolio_server::state::{AppState, open_finfolio};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "finfolio")]
#[command(about = "Personal portfolio tracker with market news", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "finfolio.toml")]
    config: PathBuf,

    /// Encrypted data file (overrides the config)
    #[arg(long, env = "FINFOLIO_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Passphrase for the data file
    #[arg(long, env = "FINFOLIO_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default)
    Serve {
        /// Address to listen on (overrides the config)
        #[arg(long, env = "FINFOLIO_BIND")]
        bind: Option<String>,
    },
    /// Refresh stock and bond prices, then save
    UpdatePrices {
        /// Only this username's holdings
        #[arg(long)]
        user: Option<String>,
        /// Only stocks or only bonds
        #[arg(long, value_enum)]
        only: Option<PriceKind>,
    },
    /// Create a staff account
    CreateSuperuser {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, env = "FINFOLIO_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,finfolio_core=info,finfolio_server=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = ServerConfig::load_or_default(&cli.config)?;
    if let Some(path) = cli.data_file {
        config.data_file = path;
    }
    if cli.passphrase.is_some() {
        config.passphrase = cli.passphrase;
    }

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            let app = open_finfolio(&config)?;
            let state = AppState::new(app, config)?.shared();
            start_server(state).await?;
        }

        Command::UpdatePrices { user, only } => {
            require_persistence(&config)?;
            let mut app = open_finfolio(&config)?;
            let summary = app
                .update_asset_prices(user.as_deref(), only.map(QuoteKind::from))
                .await?;
            save(&mut app, &config)?;
            println!(
                "Stocks updated: {}/{}",
                summary.stocks_updated, summary.stocks_total
            );
            println!(
                "Bonds updated: {}/{}",
                summary.bonds_updated, summary.bonds_total
            );
            println!("Deposits snapshotted: {}", summary.deposits_snapshotted);
        }

        Command::CreateSuperuser {
            username,
            email,
            password,
        } => {
            require_persistence(&config)?;
            let mut app = open_finfolio(&config)?;
            let profile = app.create_superuser(&username, &email, &password)?;
            save(&mut app, &config)?;
            println!("Created staff account '{}' (id {})", profile.username, profile.id);
        }
    }

    Ok(())
}

/// The one-shot commands write their result back, so they need a passphrase.
fn require_persistence(config: &ServerConfig) -> Result<()> {
    if !config.persists() {
        bail!("A passphrase is required (use --passphrase or FINFOLIO_PASSPHRASE)");
    }
    Ok(())
}

fn save(app: &mut finfolio_core::Finfolio, config: &ServerConfig) -> Result<()> {
    let passphrase = config.passphrase.as_deref().unwrap_or_default();
    app.save_to_file(&config.data_file, passphrase)
        .with_context(|| format!("Failed to save {}", config.data_file.display()))
}

//! wallet-connectors - drive a browser wallet through its bridge
//!
//! Talks to a page-side bridge that forwards `{provider, method, params}`
//! requests to the injected wallet object.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use wallet_connectors::connectors::{AuthRange, NamespaceData, WalletConnector};
use wallet_connectors::transport::{HttpTransport, WalletTransport, WsConfig, WsTransport};
use wallet_connectors::{connect_wallet, supported_wallets, ConnectorError, WalletError};

/// wallet-connectors: one contract over Cosmostation, Keplr and Leap
#[derive(Parser)]
#[command(name = "wallet-connectors")]
#[command(about = "Drive crypto wallets through one capability contract", long_about = None)]
struct Cli {
    /// Enable debug logging (every native request)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List wallets compiled into this build
    ListWallets,

    /// Connect and list accounts
    Accounts {
        #[command(flatten)]
        wallet: WalletArgs,

        /// Namespace to query
        #[arg(short, long, default_value = "cosmos")]
        namespace: String,

        /// Chain id (repeatable, required for cosmos)
        #[arg(short, long = "chain")]
        chains: Vec<String>,
    },

    /// Sign a message or document
    Sign {
        #[command(flatten)]
        wallet: WalletArgs,

        #[arg(short, long)]
        namespace: String,

        /// Signer address
        #[arg(short, long)]
        signer: String,

        /// Chain id (required for cosmos)
        #[arg(short, long)]
        chain: Option<String>,

        /// JSON document, or plain text to sign as a message
        #[arg(short, long)]
        doc: String,
    },
}

#[derive(clap::Args)]
struct WalletArgs {
    /// Wallet to use
    #[arg(short, long, default_value = "keplr")]
    wallet: String,

    /// Bridge URL (ws:// or wss:// for WebSocket, http(s):// for HTTP)
    #[arg(short, long, default_value = "ws://127.0.0.1:8546")]
    bridge: String,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Unsupported bridge URL: {0}")]
    Bridge(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {}", e);
    }

    let result = match cli.command {
        Commands::ListWallets => print_json(&supported_wallets()),
        Commands::Accounts {
            wallet,
            namespace,
            chains,
        } => accounts(&wallet, &namespace, chains).await,
        Commands::Sign {
            wallet,
            namespace,
            signer,
            chain,
            doc,
        } => sign(&wallet, &namespace, &signer, chain.as_deref(), &doc).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn open_transport(bridge: &str) -> Result<Arc<dyn WalletTransport>, CliError> {
    if bridge.starts_with("ws://") || bridge.starts_with("wss://") {
        let transport = WsTransport::connect(WsConfig::new(bridge)).await?;
        Ok(Arc::new(transport))
    } else if bridge.starts_with("http://") || bridge.starts_with("https://") {
        Ok(Arc::new(HttpTransport::new(bridge)))
    } else {
        Err(CliError::Bridge(bridge.to_string()))
    }
}

async fn accounts(args: &WalletArgs, namespace: &str, chains: Vec<String>) -> Result<(), CliError> {
    let transport = open_transport(&args.bridge).await?;
    let client = connect_wallet(&args.wallet, transport)?;

    let data = if chains.is_empty() {
        NamespaceData::any()
    } else {
        NamespaceData::chains(chains)
    };
    let range = AuthRange::new().with(namespace, data);

    client.connect(&range).await?;
    let accounts = client.get_accounts(&range).await?;
    info!("{} returned {} account(s)", client.name(), accounts.len());
    print_json(&accounts)
}

async fn sign(
    args: &WalletArgs,
    namespace: &str,
    signer: &str,
    chain: Option<&str>,
    doc: &str,
) -> Result<(), CliError> {
    let transport = open_transport(&args.bridge).await?;
    let client = connect_wallet(&args.wallet, transport)?;

    // Anything that is not JSON is a plain message
    let doc = serde_json::from_str(doc).unwrap_or_else(|_| serde_json::Value::String(doc.to_string()));
    let signature = client.sign_json(namespace, doc, signer, chain, None).await?;
    print_json(&signature)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

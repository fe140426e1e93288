//! Transfers CLI
//!
//! Command-line interface for the Transfers API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use transfers_client::TransfersClient;
use transfers_types::{CreateUserRequest, DocumentPayload, TransferId, UserId, WalletPayload};

#[derive(Parser)]
#[command(name = "transfers")]
#[command(author, version, about = "Transfers API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Transfers API
    #[arg(
        long,
        env = "TRANSFERS_API_URL",
        default_value = "http://localhost:3000"
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User operations
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Transfer operations
    Transfer {
        #[command(subcommand)]
        action: TransferCommands,
    },
    /// Transfer notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a new user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// CPF or CNPJ
        #[arg(long, default_value = "CPF")]
        document_type: String,
        #[arg(long)]
        document: String,
        /// COMMON or MERCHANT
        #[arg(long = "type", default_value = "COMMON")]
        type_user: String,
        /// Opening balance in centavos
        #[arg(long, default_value = "0")]
        amount: i64,
        #[arg(long, default_value = "BRL")]
        currency: String,
    },
    /// Get user details
    Get {
        /// User ID (UUID)
        id: String,
    },
    /// List transfers the user sent or received
    Transfers {
        /// User ID (UUID)
        id: String,
    },
}

#[derive(Subcommand)]
enum TransferCommands {
    /// Move money from a payer to a payee
    Create {
        #[arg(long)]
        payer: String,
        #[arg(long)]
        payee: String,
        /// Amount in centavos
        #[arg(long)]
        value: i64,
    },
    /// Get transfer details
    Get {
        /// Transfer ID (UUID)
        id: String,
    },
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// Start a local listener that prints delivered notifications
    Listen {
        /// Port to listen on
        #[arg(long, default_value = "4000")]
        port: u16,
    },
}

fn parse_user_id(s: &str) -> Result<UserId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid user ID: {}", s))
}

fn parse_transfer_id(s: &str) -> Result<TransferId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid transfer ID: {}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = TransfersClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => match client.health().await {
            Ok(health) => println!("✓ API is healthy ({})", health.status),
            Err(e) => {
                println!("✗ API is not healthy: {}", e);
                std::process::exit(1);
            }
        },

        Commands::User { action } => match action {
            UserCommands::Create {
                name,
                email,
                password,
                document_type,
                document,
                type_user,
                amount,
                currency,
            } => {
                let req = CreateUserRequest {
                    full_name: name,
                    email,
                    password,
                    document: DocumentPayload {
                        kind: document_type.to_uppercase(),
                        value: document,
                    },
                    wallet: WalletPayload {
                        currency: currency.to_uppercase(),
                        amount,
                    },
                    type_user,
                };
                let user = client.create_user(&req).await?;
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
            UserCommands::Get { id } => {
                let user = client.get_user(parse_user_id(&id)?).await?;
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
            UserCommands::Transfers { id } => {
                let transfers = client.list_user_transfers(parse_user_id(&id)?).await?;
                println!("{}", serde_json::to_string_pretty(&transfers)?);
            }
        },

        Commands::Transfer { action } => match action {
            TransferCommands::Create {
                payer,
                payee,
                value,
            } => {
                let transfer = client
                    .create_transfer(parse_user_id(&payer)?, parse_user_id(&payee)?, value)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&transfer)?);
            }
            TransferCommands::Get { id } => {
                let transfer = client.get_transfer(parse_transfer_id(&id)?).await?;
                println!("{}", serde_json::to_string_pretty(&transfer)?);
            }
        },

        Commands::Notifications { action } => match action {
            NotificationCommands::Listen { port } => {
                let app = axum::Router::new()
                    .route("/notifications", axum::routing::post(handle_notification));
                let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
                println!("Listening for notifications on http://{}/notifications", addr);
                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
            }
        },
    }

    Ok(())
}

async fn handle_notification(
    headers: axum::http::HeaderMap,
    body: String,
) -> impl axum::response::IntoResponse {
    println!("POST /notifications HTTP/1.1");
    for (name, value) in &headers {
        println!("{}: {:?}", name, value);
    }
    println!();
    println!("{}", body);
    println!("----------------------------------------");
    axum::http::StatusCode::OK
}
